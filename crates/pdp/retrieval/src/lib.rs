//! Piece retrieval.
//!
//! Retrieval is a stack of [`PieceRetriever`] layers behind one `fetch`:
//!
//! - [`VerifyingRetriever`] checks the bytes against the commitment
//! - [`CdnRetriever`] tries the network's CDN when asked to
//! - [`ProviderRetriever`] races the providers holding the client's data
//!
//! [`RetrievalChain`] assembles the usual stack. Every layer honours the
//! [`FetchOptions::cancel`] token.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod cdn;
mod chain;
mod error;
mod providers;
mod traits;
mod verify;

pub use cdn::CdnRetriever;
pub use chain::RetrievalChain;
pub use error::{CandidateError, CandidateFailure, Result, RetrievalError};
pub use providers::ProviderRetriever;
pub use traits::{FetchOptions, PieceRetriever, PieceStream, cancellable, collect};
pub use verify::VerifyingRetriever;
