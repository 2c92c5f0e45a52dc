//! Constant pool
//!
//! Holds the string literals, method names, instance variable names and class
//! names referenced by instructions. Entries are addressed by `u32` index.

/// String constant pool of a module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantPool {
    /// Pooled strings, in index order
    pub strings: Vec<String>,
}

impl ConstantPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a string and return its index
    pub fn add_string(&mut self, value: String) -> u32 {
        self.strings.push(value);
        (self.strings.len() - 1) as u32
    }

    /// Index of an existing entry equal to `value`
    pub fn find_string(&self, value: &str) -> Option<u32> {
        self.strings.iter().position(|s| s == value).map(|i| i as u32)
    }

    /// Get a string by index
    pub fn get_string(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
