pub mod pause;
pub mod scheduler;
pub mod stack_describer;
