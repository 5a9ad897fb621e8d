//! Chain-of-responsibility plumbing for GraphQL operations.
//!
//! A [`Link`] turns an [`Operation`] into a stream of results. Request/response transports
//! yield exactly one item; subscriptions yield many. A [`Middleware`] takes the next link
//! and returns a new link wrapping it, so a chain is an explicit ordered list folded onto a
//! terminal transport by [`compose`]. The first middleware in the list is the outermost:
//! it sees the operation first on the way out and the results last on the way back.

pub mod attach;
pub mod observe;
pub mod refresh;
pub mod split;

pub use attach::CredentialAttacher;
pub use observe::ErrorObserver;
pub use refresh::{CredentialRefresher, RESERVED_FIELD, strip_reserved_fields};
pub use split::TransportRouter;

// crates.io
use futures::{StreamExt, future, stream::{self, BoxStream}};
// self
use crate::{
	_prelude::*,
	operation::{Operation, Response},
};

/// Stream of results produced by a link.
pub type ResponseStream = BoxStream<'static, Result<Response>>;

/// Executes an operation, typically by delegating to the next link.
pub trait Link
where
	Self: Send + Sync,
{
	/// Starts the operation. The returned stream is lazy; nothing is sent before it is polled.
	fn execute(&self, operation: Operation) -> ResponseStream;
}

/// Wraps the next link in the chain.
pub trait Middleware
where
	Self: Send + Sync,
{
	/// Returns a link that runs this middleware around `next`.
	fn wrap(&self, next: Arc<dyn Link>) -> Arc<dyn Link>;
}
impl<F> Middleware for F
where
	F: Send + Sync + Fn(Arc<dyn Link>) -> Arc<dyn Link>,
{
	fn wrap(&self, next: Arc<dyn Link>) -> Arc<dyn Link> {
		self(next)
	}
}

/// Terminal link backed by a closure; handy for tests and custom transports.
pub struct FnLink<F>(F);
impl<F> FnLink<F>
where
	F: Send + Sync + Fn(Operation) -> ResponseStream,
{
	/// Wraps `f` as a link.
	pub fn new(f: F) -> Self {
		Self(f)
	}
}
impl<F> Link for FnLink<F>
where
	F: Send + Sync + Fn(Operation) -> ResponseStream,
{
	fn execute(&self, operation: Operation) -> ResponseStream {
		(self.0)(operation)
	}
}
impl<F> Debug for FnLink<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FnLink(..)")
	}
}

/// Folds `middlewares` onto `terminal`, first element outermost.
pub fn compose<I>(middlewares: I, terminal: Arc<dyn Link>) -> Arc<dyn Link>
where
	I: IntoIterator<Item = Arc<dyn Middleware>>,
	I::IntoIter: DoubleEndedIterator,
{
	middlewares.into_iter().rev().fold(terminal, |next, middleware| middleware.wrap(next))
}

/// Stream yielding a single result.
pub fn single(result: Result<Response>) -> ResponseStream {
	stream::once(future::ready(result)).boxed()
}

/// Stream yielding a single error.
pub fn failed(error: impl Into<Error>) -> ResponseStream {
	single(Err(error.into()))
}
