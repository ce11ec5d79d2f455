// notify module: delivery of release notifications

pub mod slack;

pub use slack::SlackSink;
