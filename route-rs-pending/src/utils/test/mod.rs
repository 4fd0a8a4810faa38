pub mod payload_generators;
