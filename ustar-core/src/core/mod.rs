//! Collaborators of the archive core: the ordered filename list and the
//! owner/group name lookup.

pub mod file_list;
pub mod identity;
