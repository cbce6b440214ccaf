//! Bucket/key addressing shared by the object storage backends

use crate::error::BackendError;

/// A path of the form `bucket/key`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectPath<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
}

impl<'a> ObjectPath<'a> {
    /// Split `path` at its first `/`; the key may be empty
    pub fn parse(path: &'a str) -> Result<Self, BackendError> {
        let (bucket, key) = path.split_once('/').unwrap_or((path, ""));
        if bucket.is_empty() {
            return Err(BackendError::InvalidPath {
                path: path.to_string(),
                reason: "object storage path needs a bucket".to_string(),
            });
        }
        Ok(Self { bucket, key })
    }

    /// Like [`ObjectPath::parse`] but requires a non-empty object key
    pub fn object(path: &'a str) -> Result<Self, BackendError> {
        let parsed = Self::parse(path)?;
        if parsed.key.is_empty() {
            return Err(BackendError::InvalidPath {
                path: path.to_string(),
                reason: "object storage path needs a key after the bucket".to_string(),
            });
        }
        Ok(parsed)
    }

    /// Key prefix selecting everything inside this path as a directory
    pub fn directory_prefix(&self) -> String {
        let dir = self.key.trim_end_matches('/');
        if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        }
    }
}

/// Names of the keys directly under `prefix`, skipping anything nested
/// deeper. Sorted and deduplicated.
pub fn list_children<I, S>(prefix: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = keys
        .into_iter()
        .filter_map(|key| {
            let name = key.as_ref().strip_prefix(prefix)?;
            (!name.is_empty() && !name.contains('/')).then(|| name.to_string())
        })
        .collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_and_key() {
        let path = ObjectPath::parse("bucket/dir/key.yml").unwrap();
        assert_eq!(path.bucket, "bucket");
        assert_eq!(path.key, "dir/key.yml");

        let path = ObjectPath::parse("bucket").unwrap();
        assert_eq!(path.key, "");
        assert!(ObjectPath::parse("/key").is_err());
    }

    #[test]
    fn test_object_needs_key() {
        assert!(ObjectPath::object("bucket").is_err());
        assert!(ObjectPath::object("bucket/").is_err());
        assert!(ObjectPath::object("bucket/a").is_ok());
    }

    #[test]
    fn test_directory_prefix() {
        assert_eq!(ObjectPath::parse("b/subdir").unwrap().directory_prefix(), "subdir/");
        assert_eq!(ObjectPath::parse("b/subdir/").unwrap().directory_prefix(), "subdir/");
        assert_eq!(ObjectPath::parse("b").unwrap().directory_prefix(), "");
    }

    #[test]
    fn test_list_children_is_not_recursive() {
        let keys = [
            "subdir/file.txt",
            "subdir/nested/file2.txt",
            "subdirectory/other.txt",
            "top.txt",
        ];
        assert_eq!(list_children("subdir/", keys), vec!["file.txt"]);
        assert_eq!(list_children("", keys), vec!["top.txt"]);
    }

    #[test]
    fn test_list_children_strips_whole_prefix() {
        // Characters of the prefix that also start the name must survive
        let keys = ["data/data.csv", "data/a.csv"];
        assert_eq!(list_children("data/", keys), vec!["a.csv", "data.csv"]);
    }
}
