//! Git helpers: conventional commit grammar and tag enumeration.

pub mod commits;
pub mod tags;

pub use commits::{CommitType, ConventionalHeader, parse_header};
pub use tags::{
    TagInfo, get_all_tags, get_version_from_tag, latest_release_tag,
    parse_ls_remote_tags, tag_exists,
};
