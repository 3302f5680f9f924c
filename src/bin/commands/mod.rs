pub mod bench;
pub mod build_cmd;
pub mod extract_cmd;
pub mod inspect_cmd;
pub mod match_cmd;
pub mod query_cmd;
pub mod validate_cmd;

pub use bench::cmd_bench;
pub use build_cmd::cmd_build;
pub use extract_cmd::cmd_extract;
pub use inspect_cmd::cmd_inspect;
pub use match_cmd::cmd_match;
pub use query_cmd::cmd_query;
pub use validate_cmd::cmd_validate;
