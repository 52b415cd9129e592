pub mod in_memory;
pub mod onafriq;
pub mod stub;
