pub mod time;
pub mod url;

pub use self::url::UrlUtils;
