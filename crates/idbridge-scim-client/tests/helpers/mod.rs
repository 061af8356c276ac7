//! Test helpers for the SCIM client and reconciliation engine tests:
//! resource generators, a mock SCIM provider, and a stub directory
//! source.

pub mod mock_scim;
pub mod stub_source;
pub mod test_data;
