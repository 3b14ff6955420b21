//! Form and page controllers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each flow holds the input checks and outcome mapping of one page so a view
//! layer (or the CLI) only forwards field values and renders the result.

pub mod login;
pub mod nav;
pub mod signup;
pub mod verify_email;
