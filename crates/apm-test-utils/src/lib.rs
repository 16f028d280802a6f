//! Testing utilities for the APM publish workspace
//!
//! Fixture projects and in-memory fakes of every collaborator trait, for
//! end-to-end tests of the publish pipeline.

#![allow(missing_docs)]

mod fakes;
mod fixtures;

pub use fakes::{
    FailingVerifier, FakeChain, FakeDeployer, FakePinning, MemoryContentStore, RecordingFrontend,
    StaticContractSource,
};
pub use fixtures::{
    app_name, arapp_json, finance_abi, finance_roles, finance_source_with_admin, manifest_json,
    ProjectFixture, APP_NAME, CONTRACT_NAME, FINANCE_SOURCE, NETWORK, RELEASE_FILES,
};
