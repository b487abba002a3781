pub mod dispatcher;
pub mod engine;
pub mod input;
pub mod query;

#[cfg(test)]
mod tests;
