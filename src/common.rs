pub mod db_utils;
pub mod error;
pub mod money;
pub mod i18n;
