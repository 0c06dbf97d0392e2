/*! Structured method signatures.
 *
 * Catalogs, fact files, and call expressions all name methods by the textual form
 * `<declaring.Type: name(param.Type,...)>`. Parsing normalizes that surface syntax into a
 * structured key so call resolution and sensitive-API lookup compare fields, never raw strings.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{PdgError, Result};

/// Fully resolved method signature: declaring type, method name, parameter types.
///
/// Equality and hashing are field-wise, so formatting drift between a catalog entry and a call
/// target cannot split two spellings of the same method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature {
    pub class: String,
    pub name: String,
    pub params: Vec<String>,
}

impl Signature {
    pub fn new(
        class: impl Into<String>,
        name: impl Into<String>,
        params: Vec<String>,
    ) -> Signature {
        Signature {
            class: class.into(),
            name: name.into(),
            params,
        }
    }

    /// Parse and normalize the textual form.
    ///
    /// Whitespace around the class, the name, and each parameter is insignificant. A return-type
    /// token before the method name (the JVM descriptor style) is accepted and dropped, so
    /// `<c.Foo: void bar(int)>` and `<c.Foo: bar(int)>` normalize to the same key.
    pub fn parse(text: &str) -> Result<Signature> {
        let malformed = || PdgError::MalformedSignature(text.to_string());

        let inner = text
            .trim()
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .ok_or_else(malformed)?;
        let (class, rest) = inner.split_once(':').ok_or_else(malformed)?;
        let (head, args) = rest.split_once('(').ok_or_else(malformed)?;
        let args = args.trim().strip_suffix(')').ok_or_else(malformed)?;

        let class = class.trim();
        let name = head
            .trim()
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or_default();
        if class.is_empty() || name.is_empty() {
            return Err(malformed());
        }

        let params = if args.trim().is_empty() {
            Vec::new()
        } else {
            args.split(',').map(|p| p.trim().to_string()).collect()
        };
        if params.iter().any(|p| p.is_empty()) {
            return Err(malformed());
        }

        Ok(Signature {
            class: class.to_string(),
            name: name.to_string(),
            params,
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}({})>", self.class, self.name, self.params.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_canonical_form() {
        let sig = Signature::parse("<java.sql.Statement: executeQuery(java.lang.String)>")
            .expect("canonical form parses");
        assert_eq!(sig.class, "java.sql.Statement");
        assert_eq!(sig.name, "executeQuery");
        assert_eq!(sig.params, vec!["java.lang.String".to_string()]);
    }

    #[test]
    fn display_round_trips() {
        let text = "<com.app.Db: query(java.lang.String,int)>";
        let sig = Signature::parse(text).expect("parses");
        assert_eq!(sig.to_string(), text);
    }

    #[test]
    fn return_type_token_is_dropped() {
        let with_ret = Signature::parse("<com.app.Db: void close()>").expect("parses");
        let without = Signature::parse("<com.app.Db: close()>").expect("parses");
        assert_eq!(with_ret, without);
    }

    #[test]
    fn whitespace_is_insignificant() {
        let a = Signature::parse("< com.app.Db :  query( java.lang.String , int ) >")
            .expect("parses");
        let b = Signature::parse("<com.app.Db: query(java.lang.String,int)>").expect("parses");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_params_ok() {
        let sig = Signature::parse("<com.app.Db: close()>").expect("parses");
        assert!(sig.params.is_empty());
    }

    #[test]
    fn rejects_malformed_forms() {
        for bad in [
            "com.app.Db: close()",
            "<com.app.Db close()>",
            "<com.app.Db: close>",
            "<: close()>",
            "<com.app.Db: (int)>",
            "<com.app.Db: q(int,,int)>",
        ] {
            assert!(Signature::parse(bad).is_err(), "{bad} should not parse");
        }
    }
}
