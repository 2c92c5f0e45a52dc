//! Bytecode interpreter
//!
//! One `Interpreter` runs one language thread. Compiled-to-compiled sends
//! are handled inside the dispatch loop by pushing a frame, so deep Garnet
//! recursion does not grow the native stack. Natives that call back into
//! Garnet code (`times`, `each`, `Class#new`, a thread body) go through
//! [`Interpreter::send`] / [`Interpreter::call_block`], which run a nested
//! loop until the frame depth drops back to where it started.
//!
//! A language error travels as `Err(VmError::Raised(_))`. Every nested loop
//! unwinds its own frames before handing the error to its caller, so the
//! frame stack is always consistent with the native call stack.

use super::context::VmShared;
use super::environment::Environment;
use crate::class::{Call, ClassRegistry, MethodImpl};
use crate::error::{runtime_error, wrong_arity, wrong_type};
use crate::object::{BlockObject, ObjectKind};
use crate::scheduler::{ThreadHandle, ThreadId};
use crate::stack::{CallFrame, Stack};
use crate::value::Value;
use crate::{VmError, VmResult};
use garnet_bytecode::{BytecodeReader, DecodeError, Module, Opcode, NO_BLOCK};
use parking_lot::RwLockReadGuard;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Decoded instruction with its operands
#[derive(Debug, Clone, Copy)]
enum Instruction {
    Nop,
    Pop,
    Dup,
    Swap,
    PutNil,
    PutTrue,
    PutFalse,
    PutInt(i64),
    PutFloat(f64),
    PutString(u32),
    PutSelf,
    GetLocal { depth: u8, index: u16 },
    SetLocal { depth: u8, index: u16 },
    GetIvar(u32),
    SetIvar(u32),
    GetConstant(u32),
    NewArray(u16),
    NewHash(u16),
    NewRange,
    Jump(i32),
    JumpIfFalse(i32),
    JumpIfTrue(i32),
    Send { name: u32, argc: u8, block: u16 },
    InvokeBlock(u8),
    Leave,
}

impl Instruction {
    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(match reader.read_opcode()? {
            Opcode::Nop => Instruction::Nop,
            Opcode::Pop => Instruction::Pop,
            Opcode::Dup => Instruction::Dup,
            Opcode::Swap => Instruction::Swap,
            Opcode::PutNil => Instruction::PutNil,
            Opcode::PutTrue => Instruction::PutTrue,
            Opcode::PutFalse => Instruction::PutFalse,
            Opcode::PutInt => Instruction::PutInt(reader.read_i64()?),
            Opcode::PutFloat => Instruction::PutFloat(reader.read_f64()?),
            Opcode::PutString => Instruction::PutString(reader.read_u32()?),
            Opcode::PutSelf => Instruction::PutSelf,
            Opcode::GetLocal => Instruction::GetLocal {
                depth: reader.read_u8()?,
                index: reader.read_u16()?,
            },
            Opcode::SetLocal => Instruction::SetLocal {
                depth: reader.read_u8()?,
                index: reader.read_u16()?,
            },
            Opcode::GetIvar => Instruction::GetIvar(reader.read_u32()?),
            Opcode::SetIvar => Instruction::SetIvar(reader.read_u32()?),
            Opcode::GetConstant => Instruction::GetConstant(reader.read_u32()?),
            Opcode::NewArray => Instruction::NewArray(reader.read_u16()?),
            Opcode::NewHash => Instruction::NewHash(reader.read_u16()?),
            Opcode::NewRange => Instruction::NewRange,
            Opcode::Jump => Instruction::Jump(reader.read_i32()?),
            Opcode::JumpIfFalse => Instruction::JumpIfFalse(reader.read_i32()?),
            Opcode::JumpIfTrue => Instruction::JumpIfTrue(reader.read_i32()?),
            Opcode::Send => Instruction::Send {
                name: reader.read_u32()?,
                argc: reader.read_u8()?,
                block: reader.read_u16()?,
            },
            Opcode::InvokeBlock => Instruction::InvokeBlock(reader.read_u8()?),
            Opcode::Leave => Instruction::Leave,
        })
    }
}

/// Execution engine for one language thread
pub struct Interpreter {
    shared: Arc<VmShared>,
    stack: Stack,
    thread_id: ThreadId,
}

impl Interpreter {
    pub(crate) fn new(shared: Arc<VmShared>, thread_id: ThreadId) -> Self {
        let stack = Stack::with_capacity(shared.options.max_stack_slots);
        Self {
            shared,
            stack,
            thread_id,
        }
    }

    /// Thread this interpreter runs
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Operand and frame stack
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Read access to the class registry
    pub fn classes(&self) -> RwLockReadGuard<'_, ClassRegistry> {
        self.shared.classes.read()
    }

    /// The top-level `main` object
    pub fn main_object(&self) -> Value {
        self.shared.main_object().clone()
    }

    /// Start `block` on a new language thread
    pub fn spawn_thread(&self, block: Value) -> VmResult<ThreadHandle> {
        self.shared.scheduler.spawn(self.shared.clone(), block)
    }

    // ===== Dispatch entry points =====

    /// Invoke `name` on `receiver` and wait for its result
    pub fn send(
        &mut self,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
        block: Option<Value>,
    ) -> VmResult<Value> {
        match self.lookup(receiver, name)? {
            MethodImpl::Native(f) => f(
                self,
                Call {
                    name,
                    receiver,
                    args: &args,
                    block: block.as_ref(),
                },
            ),
            MethodImpl::Compiled {
                module,
                function_id,
            } => {
                let entry_depth = self.stack.frame_count();
                self.enter_method(module, function_id, receiver.clone(), args, block)?;
                self.run_until(entry_depth)
            }
        }
    }

    /// Invoke a Block value with `args`
    pub fn call_block(&mut self, block: &Value, args: Vec<Value>) -> VmResult<Value> {
        let entry_depth = self.stack.frame_count();
        self.enter_block(block, args)?;
        self.run_until(entry_depth)
    }

    /// Whether `name` resolves for `receiver`
    pub fn responds_to(&self, receiver: &Value, name: &str) -> bool {
        self.classes().resolve_for(receiver, name).is_some()
    }

    pub(crate) fn run_function(
        &mut self,
        module: Arc<Module>,
        function_id: usize,
        self_value: Value,
    ) -> VmResult<Value> {
        let entry_depth = self.stack.frame_count();
        self.enter_method(module, function_id, self_value, Vec::new(), None)?;
        self.run_until(entry_depth)
    }

    // ===== Frames =====

    fn lookup(&self, receiver: &Value, name: &str) -> VmResult<MethodImpl> {
        log::trace!("send {} to {}", name, receiver.type_name());
        let method = self.classes().resolve_for(receiver, name);
        method.ok_or_else(|| {
            runtime_error(format_args!(
                "Undefined method '{}' for {}",
                name,
                receiver.type_name()
            ))
        })
    }

    fn check_depth(&self) -> VmResult<()> {
        let limit = self.shared.options.max_call_depth;
        if self.stack.frame_count() >= limit {
            return Err(runtime_error(format_args!("Stack overflow. depth={}", limit)));
        }
        Ok(())
    }

    fn enter_method(
        &mut self,
        module: Arc<Module>,
        function_id: usize,
        receiver: Value,
        args: Vec<Value>,
        block: Option<Value>,
    ) -> VmResult<()> {
        let (param_count, local_count) = frame_layout(&module, function_id)?;
        if args.len() != param_count {
            return Err(wrong_arity(param_count, args.len()));
        }
        self.check_depth()?;

        let env = Environment::root(local_count);
        for (index, arg) in args.into_iter().enumerate() {
            env.set(0, index, arg)?;
        }
        let base = self.stack.depth();
        self.stack
            .push_frame(CallFrame::new(module, function_id, base, env, receiver, block));
        Ok(())
    }

    fn enter_block(&mut self, block: &Value, args: Vec<Value>) -> VmResult<()> {
        let closure = match block.kind() {
            Some(ObjectKind::Block(closure)) => closure,
            _ => return Err(wrong_type("Block", block)),
        };
        let (param_count, local_count) = frame_layout(&closure.module, closure.function_id)?;
        self.check_depth()?;

        // Blocks bind leniently: missing arguments stay nil, extras are dropped
        let env = Environment::child(&closure.env, local_count);
        for (index, arg) in args.into_iter().take(param_count).enumerate() {
            env.set(0, index, arg)?;
        }
        let base = self.stack.depth();
        self.stack.push_frame(CallFrame::new(
            closure.module.clone(),
            closure.function_id,
            base,
            env,
            closure.self_value.clone(),
            None,
        ));
        Ok(())
    }

    fn frame(&self) -> VmResult<&CallFrame> {
        self.stack
            .current_frame()
            .ok_or_else(|| VmError::InvalidBytecode("no active call frame".to_string()))
    }

    fn frame_mut(&mut self) -> VmResult<&mut CallFrame> {
        self.stack
            .current_frame_mut()
            .ok_or_else(|| VmError::InvalidBytecode("no active call frame".to_string()))
    }

    // ===== Dispatch loop =====

    fn run_until(&mut self, entry_depth: usize) -> VmResult<Value> {
        let result = self.execute(entry_depth);
        if result.is_err() {
            while self.stack.frame_count() > entry_depth {
                self.stack.pop_frame()?;
            }
        }
        result
    }

    fn execute(&mut self, entry_depth: usize) -> VmResult<Value> {
        loop {
            let (module, function_id, ip) = {
                let frame = self.frame()?;
                (frame.module.clone(), frame.function_id, frame.ip)
            };
            let code = module
                .functions
                .get(function_id)
                .map(|f| f.code.as_slice())
                .ok_or_else(|| VmError::InvalidBytecode(format!("no function {}", function_id)))?;

            let mut reader = BytecodeReader::new(code);
            reader.seek(ip);
            let instruction = Instruction::decode(&mut reader)?;
            let next_ip = reader.position();
            self.frame_mut()?.ip = next_ip;

            match instruction {
                Instruction::Nop => {}
                Instruction::Pop => {
                    self.stack.pop()?;
                }
                Instruction::Dup => {
                    let top = self.stack.peek()?.clone();
                    self.stack.push(top)?;
                }
                Instruction::Swap => self.stack.swap()?,

                // Literals
                Instruction::PutNil => self.stack.push(Value::nil())?,
                Instruction::PutTrue => self.stack.push(Value::bool(true))?,
                Instruction::PutFalse => self.stack.push(Value::bool(false))?,
                Instruction::PutInt(i) => self.stack.push(Value::int(i))?,
                Instruction::PutFloat(f) => self.stack.push(Value::float(f))?,
                Instruction::PutString(index) => {
                    let text = constant(&module, index)?;
                    self.stack.push(Value::string(text))?;
                }
                Instruction::PutSelf => {
                    let receiver = self.frame()?.self_value.clone();
                    self.stack.push(receiver)?;
                }

                // Variables
                Instruction::GetLocal { depth, index } => {
                    let value = self.frame()?.env.get(depth as usize, index as usize)?;
                    self.stack.push(value)?;
                }
                Instruction::SetLocal { depth, index } => {
                    let value = self.stack.pop()?;
                    self.frame()?.env.set(depth as usize, index as usize, value)?;
                }
                Instruction::GetIvar(index) => {
                    let name = constant(&module, index)?;
                    let value = match self.frame()?.self_value.kind() {
                        Some(ObjectKind::Instance(instance)) => {
                            instance.ivars.lock().get(name).cloned().unwrap_or_default()
                        }
                        _ => Value::nil(),
                    };
                    self.stack.push(value)?;
                }
                Instruction::SetIvar(index) => {
                    let name = constant(&module, index)?;
                    let value = self.stack.pop()?;
                    let receiver = self.frame()?.self_value.clone();
                    match receiver.kind() {
                        Some(ObjectKind::Instance(instance)) => {
                            instance.ivars.lock().insert(name.to_string(), value);
                        }
                        _ => {
                            return Err(runtime_error(format_args!(
                                "Can't set instance variable {} on {}",
                                name,
                                receiver.type_name()
                            )))
                        }
                    }
                }
                Instruction::GetConstant(index) => {
                    let name = constant(&module, index)?;
                    let class = self
                        .classes()
                        .get_class_by_name(name)
                        .map(|class| class.object().clone());
                    let class = class.ok_or_else(|| {
                        runtime_error(format_args!("Uninitialized constant {}", name))
                    })?;
                    self.stack.push(class)?;
                }

                // Constructors
                Instruction::NewArray(count) => {
                    let items = self.stack.pop_n(count as usize)?;
                    self.stack.push(Value::array(items))?;
                }
                Instruction::NewHash(pairs) => {
                    let flat = self.stack.pop_n(pairs as usize * 2)?;
                    let mut entries = BTreeMap::new();
                    for pair in flat.chunks(2) {
                        let key = pair[0].as_string().ok_or_else(|| wrong_type("String", &pair[0]))?;
                        entries.insert(key, pair[1].clone());
                    }
                    self.stack.push(Value::hash(entries))?;
                }
                Instruction::NewRange => {
                    let to = self.stack.pop()?;
                    let from = self.stack.pop()?;
                    let from_i = from.as_int().ok_or_else(|| wrong_type("Integer", &from))?;
                    let to_i = to.as_int().ok_or_else(|| wrong_type("Integer", &to))?;
                    self.stack.push(Value::range(from_i, to_i))?;
                }

                // Control flow
                Instruction::Jump(offset) => self.jump(code.len(), next_ip, offset)?,
                Instruction::JumpIfFalse(offset) => {
                    if !self.stack.pop()?.is_truthy() {
                        self.jump(code.len(), next_ip, offset)?;
                    }
                }
                Instruction::JumpIfTrue(offset) => {
                    if self.stack.pop()?.is_truthy() {
                        self.jump(code.len(), next_ip, offset)?;
                    }
                }

                // Calls
                Instruction::Send { name, argc, block } => {
                    self.op_send(&module, name, argc, block)?;
                }
                Instruction::InvokeBlock(argc) => {
                    let args = self.stack.pop_n(argc as usize)?;
                    let block = self
                        .frame()?
                        .block
                        .clone()
                        .ok_or_else(|| runtime_error("Can't yield without a block"))?;
                    let result = self.call_block(&block, args)?;
                    self.stack.push(result)?;
                }
                Instruction::Leave => {
                    let result = self.stack.pop()?;
                    self.stack.pop_frame()?;
                    if self.stack.frame_count() <= entry_depth {
                        return Ok(result);
                    }
                    self.stack.push(result)?;
                }
            }
        }
    }

    fn jump(&mut self, code_len: usize, next_ip: usize, offset: i32) -> VmResult<()> {
        let target = next_ip as i64 + offset as i64;
        if target < 0 || target as usize >= code_len {
            return Err(VmError::InvalidBytecode(format!(
                "jump target {} out of bounds",
                target
            )));
        }
        self.frame_mut()?.ip = target as usize;
        Ok(())
    }

    fn op_send(&mut self, module: &Arc<Module>, name: u32, argc: u8, block: u16) -> VmResult<()> {
        let name = constant(module, name)?;
        let args = self.stack.pop_n(argc as usize)?;
        let receiver = self.stack.pop()?;
        let block = if block == NO_BLOCK {
            None
        } else {
            let frame = self.frame()?;
            Some(Value::object(
                crate::class::ids::BLOCK,
                ObjectKind::Block(BlockObject {
                    module: module.clone(),
                    function_id: block as usize,
                    env: frame.env.clone(),
                    self_value: frame.self_value.clone(),
                }),
            ))
        };

        match self.lookup(&receiver, name)? {
            MethodImpl::Native(f) => {
                let result = f(
                    self,
                    Call {
                        name,
                        receiver: &receiver,
                        args: &args,
                        block: block.as_ref(),
                    },
                )?;
                self.stack.push(result)
            }
            // Compiled bodies run in this loop; `Leave` pushes the result
            MethodImpl::Compiled {
                module,
                function_id,
            } => self.enter_method(module, function_id, receiver, args, block),
        }
    }
}

fn constant(module: &Module, index: u32) -> VmResult<&str> {
    module
        .constants
        .get_string(index)
        .ok_or_else(|| VmError::InvalidBytecode(format!("constant {} out of bounds", index)))
}

fn frame_layout(module: &Module, function_id: usize) -> VmResult<(usize, usize)> {
    let function = module
        .functions
        .get(function_id)
        .ok_or_else(|| VmError::InvalidBytecode(format!("no function {}", function_id)))?;
    Ok((
        function.param_count,
        function.local_count.max(function.param_count),
    ))
}
