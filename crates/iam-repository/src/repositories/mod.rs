pub(crate) mod access_log_repository;
pub(crate) mod sync_watermark_repository;
