//! Fuzz test for table identifier resolution and row-query rendering
//!
//! Any input the resolver accepts must render to a statement whose
//! identifiers are fully quoted, and every part must pass the allow-list.
//!
//! Run with: cargo +nightly fuzz run identifier_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use tablescope_core::{
    build_row_query, is_allowed, IdentQuoting, IdentifierResolver, RowLimit, DBO_SCHEMA,
};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(resolver) = IdentifierResolver::new(DBO_SCHEMA) else {
        return;
    };

    let Ok(ident) = resolver.resolve(input) else {
        return;
    };
    assert!(!ident.schema().is_empty() && !ident.table().is_empty());
    assert!(is_allowed(ident.schema()) && is_allowed(ident.table()));
    assert!(!ident.schema().contains('"') && !ident.table().contains('"'));

    let Ok(limit) = RowLimit::new(1) else {
        return;
    };
    if let Ok(query) = build_row_query(&ident, limit, IdentQuoting::Client) {
        let expected = format!(
            "SELECT * FROM \"{}\".\"{}\" LIMIT 1",
            ident.schema(),
            ident.table()
        );
        assert_eq!(query.text, expected);
    }
    if let Ok(query) = build_row_query(&ident, limit, IdentQuoting::Server) {
        assert_eq!(query.params, vec![ident.schema().to_string(), ident.table().to_string()]);
    }
});
