//! Contract bindings for the Fortress money market.
//!
//! Interfaces are declared inline with `sol!` and only cover the entry
//! points the client actually encodes. Calls are encoded with
//! [`alloy::sol_types::SolCall`] and routed through [`crate::ChainClient`].

mod common;
mod fortress;

pub use common::IERC20;
pub use fortress::{
    Ballot, Delegation, IComptroller, IFBnb, IFToken, IFaiController, IFts, IGovernor,
    IPriceOracle,
};
