mod format_duration;
mod write_file;

pub(crate) use format_duration::format_duration;
pub(crate) use write_file::write_atomically;
