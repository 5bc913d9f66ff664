// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Stratosphere
//!
//! Typed, validated deployment manifests reconciled against Google Cloud
//! Deployment Manager.
//!
//! ## Overview
//!
//! Stratosphere lets you describe cloud resources as typed trees and keep a
//! deployment in sync with them:
//!
//! - Declare resources against schemas that check types, constraints and
//!   cross-field rules before anything leaves the machine
//! - Render a template to a deterministic YAML or JSON manifest
//! - Diff the manifest against the deployed one and apply only real changes
//! - Wait for the remote operation and report every error it carries
//!
//! ## Architecture
//!
//! 1. **Schemas**: [`schema`] and the built-in kinds in [`catalog`]
//! 2. **Templates**: [`template`] groups resources into one deployment
//! 3. **Manifests**: [`manifest`] lowers and renders the tree
//! 4. **Reconciler**: [`reconciler`] compares, confirms, submits and polls
//!
//! ## Modules
//!
//! - [`schema`]: Attribute schemas, values and validation
//! - [`catalog`]: Built-in compute and container kinds, catalog files
//! - [`reference`]: `$(ref.<resource>.<attribute>)` tokens
//! - [`template`]: Deployment templates
//! - [`manifest`]: Manifest documents and their text formats
//! - [`remote`]: Deployment Manager API client
//! - [`planner`]: Manifest diffs, plans and operation polling
//! - [`reconciler`]: Apply and delete workflows
//! - [`config`]: Client settings
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! template: networks
//! resources:
//!   - kind: compute.v1.network
//!     properties:
//!       name: "{env}-network"
//!       autoCreateSubnetworks: false
//!   - kind: compute.v1.subnetwork
//!     properties:
//!       name: "{env}-subnet"
//!       network: "$(ref.{env}-network.selfLink)"
//!       ipCidrRange: 10.0.0.0/24
//!       region: europe-west1
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod planner;
pub mod reconciler;
pub mod reference;
pub mod remote;
pub mod schema;
pub mod template;

// ============================================================================
// Re-exports
// ============================================================================

pub use catalog::CatalogFile;
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{Settings, SettingsParser, SettingsValidator};
pub use error::{Result, StratosphereError};
pub use manifest::{Manifest, ManifestFormat};
pub use planner::{DeploymentPlan, DiffEngine, PlanExecutor};
pub use reconciler::{AutoApprove, Confirmer, ReconciliationResult, Reconciler};
pub use reference::Reference;
pub use remote::{DeploymentApi, DeploymentManagerClient};
pub use schema::{Properties, Resource, Schema, Value};
pub use template::{Template, TemplateContext, TemplateSource};
