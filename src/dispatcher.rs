//! Authorization dispatcher façade.
//!
//! [`AuthorizationDispatcher`] is the single entry point applications talk to. It renders
//! authorization requests for the launcher and runs token exchange, dynamic registration, and ID
//! token validation on background workers, delivering exactly one result per call through the
//! configured [`ResultDelivery`].
//!
//! Misuse (a disposed dispatcher, a missing launcher or endpoint) is reported synchronously from
//! the call itself and never reaches a callback.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use tokio::runtime::Handle;
// self
#[cfg(feature = "reqwest")]
use crate::http::{DefaultTransportErrorMapper, ReqwestHttpClient};
use crate::{
	_prelude::*,
	auth::ClientAuthentication,
	delivery::{InlineDelivery, ResultDelivery},
	error::{AuthorizationError, ConfigError},
	executor::RequestExecutor,
	http::{ConnectionFactory, TransportErrorMapper},
	launcher::{
		AuthorizationLaunch, AuthorizationLauncher, LaunchConfig, LaunchTarget, TitleVisibility,
	},
	model::{
		AuthorizationRequest, RegistrationRequest, RegistrationResponse, TokenRequest,
		TokenResponse,
	},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	validate::{self, ValidationOutcome},
};

/// Dispatcher wired to the default reqwest connection factory.
#[cfg(feature = "reqwest")]
pub type ReqwestDispatcher =
	AuthorizationDispatcher<ReqwestHttpClient, DefaultTransportErrorMapper>;

/// Dispatches authorization requests and performs endpoint exchanges.
///
/// The dispatcher holds no per-operation state. Each `perform_*` call moves its inputs onto a
/// fresh worker task; disposal gates new calls but never interrupts work already in flight.
pub struct AuthorizationDispatcher<C, M>
where
	C: ?Sized + ConnectionFactory,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	executor: Arc<RequestExecutor<C, M>>,
	launcher: Mutex<Option<Arc<dyn AuthorizationLauncher>>>,
	delivery: Arc<dyn ResultDelivery>,
	runtime: Handle,
	disposed: AtomicBool,
}
#[cfg(feature = "reqwest")]
impl AuthorizationDispatcher<ReqwestHttpClient, DefaultTransportErrorMapper> {
	/// Creates a dispatcher on the ambient Tokio runtime using the default reqwest client.
	///
	/// No launcher is installed and callbacks run inline on the worker.
	pub fn new() -> Result<Self> {
		Self::builder(ReqwestHttpClient::default(), DefaultTransportErrorMapper).build()
	}
}
impl<C, M> AuthorizationDispatcher<C, M>
where
	C: ?Sized + ConnectionFactory,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Starts building a dispatcher over the provided connection factory and error mapper.
	pub fn builder(
		connections: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> AuthorizationDispatcherBuilder<C, M> {
		AuthorizationDispatcherBuilder {
			connections: connections.into(),
			mapper: mapper.into(),
			launcher: None,
			delivery: None,
			runtime: None,
		}
	}

	/// Whether [`AuthorizationDispatcher::dispose`] has been called.
	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::Acquire)
	}

	/// Renders the authorization request URI without any side effects.
	pub fn prepare_authorization_request(&self, request: &AuthorizationRequest) -> Result<Url> {
		self.ensure_active()?;

		Ok(request.to_uri())
	}

	/// Hands the authorization request to the installed launcher.
	///
	/// The launcher receives the request URI with the title bar hidden, plus the targets where the
	/// authorization response or a user cancellation should land. No network I/O happens here.
	pub fn dispatch_authorization_request(
		&self,
		request: &AuthorizationRequest,
		completion: LaunchTarget,
		cancellation: Option<LaunchTarget>,
		config: LaunchConfig,
	) -> Result<()> {
		const KIND: OperationKind = OperationKind::Authorization;

		self.ensure_active()?;

		let _guard = OperationSpan::new(KIND, "dispatch_authorization_request").entered();

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let launcher = self.launcher.lock().clone();
		let launched = launcher
			.filter(|launcher| launcher.is_available())
			.ok_or(Error::NoLauncher)
			.and_then(|launcher| {
				launcher
					.launch(AuthorizationLaunch {
						request_uri: request.to_uri(),
						title_visibility: TitleVisibility::Hidden,
						completion,
						cancellation,
						config,
					})
					.map_err(|source| Error::Launch { source })
			});
		let outcome =
			if launched.is_ok() { OperationOutcome::Success } else { OperationOutcome::Failure };

		obs::record_operation_outcome(KIND, outcome);

		launched
	}

	/// Exchanges a grant at the token endpoint.
	///
	/// `auth`'s headers are added to the request and its parameters merged over the request's own
	/// form fields. `callback` runs exactly once.
	pub fn perform_token_request<F>(
		&self,
		request: TokenRequest,
		auth: &ClientAuthentication,
		callback: F,
	) -> Result<()>
	where
		F: 'static + Send + FnOnce(Result<TokenResponse, AuthorizationError>),
	{
		self.ensure_active()?;

		let executor = self.executor.clone();
		let auth = auth.clone();

		self.spawn(
			OperationKind::Token,
			"perform_token_request",
			async move { executor.exchange_token(request, &auth).await },
			callback,
		);

		Ok(())
	}

	/// Registers a client at the registration endpoint.
	///
	/// No client authentication is applied. Fails synchronously when the request's configuration
	/// has no registration endpoint.
	pub fn perform_registration_request<F>(
		&self,
		request: RegistrationRequest,
		callback: F,
	) -> Result<()>
	where
		F: 'static + Send + FnOnce(Result<RegistrationResponse, AuthorizationError>),
	{
		self.ensure_active()?;

		let endpoint = request.configuration.require_registration_endpoint()?.clone();
		let executor = self.executor.clone();

		self.spawn(
			OperationKind::Registration,
			"perform_registration_request",
			async move { executor.register_client(request, endpoint).await },
			callback,
		);

		Ok(())
	}

	/// Fetches the key set and checks the ID token carried by `response`.
	///
	/// The key set is fetched without client credentials; `_auth` is accepted for call-site
	/// symmetry with [`AuthorizationDispatcher::perform_token_request`]. Fails synchronously when
	/// the configuration has no key-set endpoint.
	pub fn perform_token_validation<F>(
		&self,
		response: TokenResponse,
		_auth: &ClientAuthentication,
		callback: F,
	) -> Result<()>
	where
		F: 'static + Send + FnOnce(ValidationOutcome),
	{
		self.ensure_active()?;

		let endpoint = response.request.configuration.require_key_set_endpoint()?.clone();
		let executor = self.executor.clone();

		self.spawn(
			OperationKind::TokenValidation,
			"perform_token_validation",
			async move {
				let key_set = executor.fetch_key_set(endpoint).await?;
				let is_valid = validate::validate_token_response(&key_set, &response);

				Ok::<_, AuthorizationError>(is_valid)
			},
			move |result| {
				callback(match result {
					Ok(is_valid) => ValidationOutcome::checked(is_valid),
					Err(err) => ValidationOutcome::failed(err),
				})
			},
		);

		Ok(())
	}

	/// Disposes the dispatcher and releases the launcher binding.
	///
	/// Idempotent. Work already in flight still completes and delivers its result.
	pub fn dispose(&self) {
		if self.disposed.swap(true, Ordering::AcqRel) {
			return;
		}

		let launcher = self.launcher.lock().take();

		if let Some(launcher) = launcher {
			launcher.unbind();
		}
	}

	fn ensure_active(&self) -> Result<()> {
		if self.is_disposed() { Err(Error::Disposed) } else { Ok(()) }
	}

	fn spawn<T, Fut, F>(&self, kind: OperationKind, stage: &'static str, work: Fut, callback: F)
	where
		T: 'static + Send,
		Fut: 'static + Send + Future<Output = Result<T, AuthorizationError>>,
		F: 'static + Send + FnOnce(Result<T, AuthorizationError>),
	{
		obs::record_operation_outcome(kind, OperationOutcome::Attempt);

		let delivery = self.delivery.clone();
		let worker = OperationSpan::new(kind, stage).instrument(async move {
			let result = work.await;

			match &result {
				Ok(_) => obs::record_operation_outcome(kind, OperationOutcome::Success),
				Err(err) => {
					obs::trace_failure(kind, err);
					obs::record_operation_outcome(kind, OperationOutcome::Failure);
				},
			}

			delivery.deliver(Box::new(move || callback(result)));
		});

		drop(self.runtime.spawn(worker));
	}
}
impl<C, M> Drop for AuthorizationDispatcher<C, M>
where
	C: ?Sized + ConnectionFactory,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn drop(&mut self) {
		self.dispose();
	}
}
impl<C, M> Debug for AuthorizationDispatcher<C, M>
where
	C: ?Sized + ConnectionFactory,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationDispatcher")
			.field("has_launcher", &self.launcher.lock().is_some())
			.field("disposed", &self.is_disposed())
			.finish_non_exhaustive()
	}
}

/// Builder returned by [`AuthorizationDispatcher::builder`].
pub struct AuthorizationDispatcherBuilder<C, M>
where
	C: ?Sized + ConnectionFactory,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	connections: Arc<C>,
	mapper: Arc<M>,
	launcher: Option<Arc<dyn AuthorizationLauncher>>,
	delivery: Option<Arc<dyn ResultDelivery>>,
	runtime: Option<Handle>,
}
impl<C, M> AuthorizationDispatcherBuilder<C, M>
where
	C: ?Sized + ConnectionFactory,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Installs the launcher used by
	/// [`AuthorizationDispatcher::dispatch_authorization_request`].
	pub fn launcher(mut self, launcher: impl 'static + AuthorizationLauncher) -> Self {
		self.launcher = Some(Arc::new(launcher));

		self
	}

	/// Installs a shared launcher.
	pub fn shared_launcher(mut self, launcher: Arc<dyn AuthorizationLauncher>) -> Self {
		self.launcher = Some(launcher);

		self
	}

	/// Sets where completion callbacks run. Defaults to [`InlineDelivery`].
	pub fn delivery(mut self, delivery: impl 'static + ResultDelivery) -> Self {
		self.delivery = Some(Arc::new(delivery));

		self
	}

	/// Sets the runtime that hosts worker tasks. Defaults to the ambient runtime.
	pub fn runtime(mut self, handle: Handle) -> Self {
		self.runtime = Some(handle);

		self
	}

	/// Builds the dispatcher and binds the launcher, if any.
	pub fn build(self) -> Result<AuthorizationDispatcher<C, M>> {
		let runtime = match self.runtime {
			Some(handle) => handle,
			None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
		};

		if let Some(launcher) = &self.launcher {
			launcher.bind();
		}

		Ok(AuthorizationDispatcher {
			executor: Arc::new(RequestExecutor::new(self.connections, self.mapper)),
			launcher: Mutex::new(self.launcher),
			delivery: self
				.delivery
				.unwrap_or_else(|| Arc::new(InlineDelivery) as Arc<dyn ResultDelivery>),
			runtime,
			disposed: AtomicBool::new(false),
		})
	}
}
impl<C, M> Debug for AuthorizationDispatcherBuilder<C, M>
where
	C: ?Sized + ConnectionFactory,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationDispatcherBuilder")
			.field("has_launcher", &self.launcher.is_some())
			.field("has_runtime", &self.runtime.is_some())
			.finish_non_exhaustive()
	}
}
