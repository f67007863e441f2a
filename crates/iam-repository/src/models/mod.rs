pub(crate) mod access_log;
pub(crate) mod sync_watermark;
