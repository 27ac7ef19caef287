pub mod bitrix;
pub mod leads;
pub mod webhook;
