//! Input guards for values that end up in SOQL text or URL paths.
//!
//! Integration names and namespaces reach SOQL through string formatting, so
//! every literal goes through [`soql::escape_string`] and every identifier
//! through [`soql::is_safe_field_name`] first.
//!
//! ```rust
//! use tally_sf_client::security::soql;
//!
//! let name = soql::escape_string("Orders 'nightly'");
//! let query = format!("SELECT Id FROM Integration__c WHERE Name = '{}'", name);
//! assert_eq!(query, "SELECT Id FROM Integration__c WHERE Name = 'Orders \\'nightly\\''");
//! ```

/// SOQL literal escaping and identifier checks.
pub mod soql {
    /// Escape a value for use inside a single-quoted SOQL literal.
    ///
    /// ```rust
    /// use tally_sf_client::security::soql;
    ///
    /// assert_eq!(soql::escape_string("O'Brien"), "O\\'Brien");
    /// ```
    #[must_use]
    pub fn escape_string(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 8);
        for ch in value.chars() {
            match ch {
                '\'' => escaped.push_str("\\'"),
                '\\' => escaped.push_str("\\\\"),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }

    /// True for names made of ASCII letters, digits and underscores that
    /// start with a letter (`Name`, `KicksawEng__Operation__c`).
    #[must_use]
    pub fn is_safe_field_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {
                chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_safe_sobject_name(name: &str) -> bool {
        is_safe_field_name(name)
    }
}

/// URL path guards.
pub mod url {
    /// 15 or 18 alphanumeric characters.
    ///
    /// ```rust
    /// use tally_sf_client::security::url;
    ///
    /// assert!(url::is_valid_salesforce_id("a0B000000000001AAA"));
    /// assert!(!url::is_valid_salesforce_id("001/../../etc"));
    /// ```
    #[must_use]
    pub fn is_valid_salesforce_id(id: &str) -> bool {
        let len = id.len();
        (len == 15 || len == 18) && id.chars().all(|c| c.is_ascii_alphanumeric())
    }

    /// `sobjects/{sobject}/{id}`, or `None` if either part is unsafe.
    #[must_use]
    pub fn sobject_path(sobject: &str, id: &str) -> Option<String> {
        if !super::soql::is_safe_sobject_name(sobject) || !is_valid_salesforce_id(id) {
            return None;
        }
        Some(format!("sobjects/{}/{}", sobject, id))
    }
}
