use hyper::header::AsHeaderName;
use hyper::http::request::Parts;

pub trait HeaderExt {
    fn get_header<K: AsHeaderName>(&self, header: K) -> Option<String>;
    fn tenant(&self) -> Option<&str>;
}

impl HeaderExt for Parts {
    fn get_header<K>(&self, header: K) -> Option<String>
    where
        K: AsHeaderName,
    {
        self.headers
            .get(header)
            .and_then(|header| header.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
    }

    /// The first segment of the request path, e.g. `123` for `/123/stacks`.
    fn tenant(&self) -> Option<&str> {
        tenant_from_path(self.uri.path())
    }
}

fn tenant_from_path(path: &str) -> Option<&str> {
    let path = path.strip_prefix('/')?;
    let segment = path.split('/').next()?;

    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}
