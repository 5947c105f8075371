pub mod connector;
pub mod events;
pub mod jobs;
pub mod lark;
pub mod sync;

#[cfg(test)]
mod test_support;
