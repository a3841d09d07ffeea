use crate::ast::TagId;
use crc32fast::Hasher;

/// Generate a document seed from its name using CRC32
pub fn get_document_seed(name: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for nodes and entities read from one document
#[derive(Debug, Clone)]
pub struct IDGenerator {
    seed: String,
    count: u32,
}

impl IDGenerator {
    pub fn new(name: &str) -> Self {
        Self {
            seed: get_document_seed(name),
            count: 0,
        }
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    pub fn new_tag_id(&mut self) -> TagId {
        TagId::new(self.new_id())
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
