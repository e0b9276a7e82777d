pub mod artifacts;
pub mod assembler;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod renderer;
pub mod writer;

#[cfg(test)]
pub mod testing;
