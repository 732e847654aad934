//! Unique id capability used to mint timer identities.

/// Produces a string distinct from every value it produced before, for the
/// lifetime of the process. Collisions are undefined behavior for the wheel.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Default generator: random UUID v4 in its 32-char simple form.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}
