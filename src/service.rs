//! Long-lived conversion service driven by an external controller.
//!
//! The controller binds a REQ socket and starts this process with its
//! endpoint. Each request is an absolute image path; each reply is the
//! artifact path or [`ERROR_REPLY`]. The literal [`QUIT_TOKEN`] ends the
//! service without a reply. A request that cannot be decoded is answered with
//! [`ERROR_REPLY`] like any other failed job.

use crate::context::InferenceContext;
use crate::error::{DepthGenError, DepthGenResult};
use crate::pipeline::Pipeline;
use tracing::{debug, info, warn};
use zeromq::{RepSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

pub const QUIT_TOKEN: &str = "quit";
pub const ERROR_REPLY: &str = "ERROR";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
	Path(String),
	/// Received but undecodable; carries the reason for the log.
	Malformed(String),
}

impl Request {
	pub fn is_quit(&self) -> bool {
		matches!(self, Request::Path(path) if path == QUIT_TOKEN)
	}
}

/// Strictly alternating request/reply transport.
///
/// The orchestrator never calls `receive` twice without a `reply` in between.
/// A controller that sends a second request before reading the first reply is
/// breaking the protocol; the channel does not queue or reorder for it.
#[allow(async_fn_in_trait)]
pub trait RequestChannel {
	/// Blocks until the next request arrives. There is no timeout.
	///
	/// `Err` is reserved for transport failures. A message that arrived but
	/// cannot be read as a path is [`Request::Malformed`] and still owes a reply.
	async fn receive(&mut self) -> DepthGenResult<Request>;

	async fn reply(&mut self, message: &str) -> DepthGenResult<()>;

	async fn disconnect(&mut self) -> DepthGenResult<()>;
}

/// ZeroMQ REP socket connected to the controller's REQ endpoint.
pub struct ZmqChannel {
	endpoint: String,
	socket: Option<RepSocket>,
}

impl ZmqChannel {
	pub async fn connect(endpoint: &str) -> DepthGenResult<Self> {
		let mut socket = RepSocket::new();
		socket.connect(endpoint).await.map_err(|e| {
			DepthGenError::Channel(format!("Failed to connect to {}: {}", endpoint, e))
		})?;
		info!("Connected to controller at {}", endpoint);

		Ok(Self {
			endpoint: endpoint.to_string(),
			socket: Some(socket),
		})
	}

	fn socket(&mut self) -> DepthGenResult<&mut RepSocket> {
		self.socket
			.as_mut()
			.ok_or_else(|| DepthGenError::Channel(format!("{} is disconnected", self.endpoint)))
	}
}

impl RequestChannel for ZmqChannel {
	async fn receive(&mut self) -> DepthGenResult<Request> {
		let message = self
			.socket()?
			.recv()
			.await
			.map_err(|e| DepthGenError::Channel(format!("Failed to receive request: {}", e)))?;

		Ok(match String::try_from(message) {
			Ok(path) => Request::Path(path),
			Err(e) => Request::Malformed(format!("not a single UTF-8 frame: {}", e)),
		})
	}

	async fn reply(&mut self, message: &str) -> DepthGenResult<()> {
		self.socket()?
			.send(ZmqMessage::from(message.to_string()))
			.await
			.map_err(|e| DepthGenError::Channel(format!("Failed to send reply: {}", e)))
	}

	async fn disconnect(&mut self) -> DepthGenResult<()> {
		// Dropping the socket closes the connection and its context.
		if let Some(socket) = self.socket.take() {
			drop(socket);
			debug!("Disconnected from {}", self.endpoint);
		}
		Ok(())
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceState {
	AwaitingRequest,
	Processing(String),
	Terminated,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceSummary {
	pub processed: usize,
	pub failed: usize,
}

/// Receive, convert, reply; one request in flight at a time.
///
/// Jobs run through `block_in_place`, so the orchestrator must be driven on
/// tokio's multi-thread runtime.
pub struct ServiceOrchestrator<'a, C: RequestChannel> {
	pipeline: &'a Pipeline,
	context: &'a mut InferenceContext,
	channel: &'a mut C,
	state: ServiceState,
	summary: ServiceSummary,
}

impl<'a, C: RequestChannel> ServiceOrchestrator<'a, C> {
	pub fn new(pipeline: &'a Pipeline, context: &'a mut InferenceContext, channel: &'a mut C) -> Self {
		Self {
			pipeline,
			context,
			channel,
			state: ServiceState::AwaitingRequest,
			summary: ServiceSummary::default(),
		}
	}

	pub fn state(&self) -> &ServiceState {
		&self.state
	}

	pub fn summary(&self) -> &ServiceSummary {
		&self.summary
	}

	/// Runs until the quit token arrives. Job failures are answered with
	/// [`ERROR_REPLY`]; only transport errors end the loop early.
	pub async fn run(mut self) -> DepthGenResult<ServiceSummary> {
		while self.state != ServiceState::Terminated {
			self.step().await?;
		}
		info!(
			"Service stopped after {} requests ({} failed)",
			self.summary.processed + self.summary.failed,
			self.summary.failed
		);
		Ok(self.summary)
	}

	/// Performs exactly one state transition.
	pub async fn step(&mut self) -> DepthGenResult<()> {
		let state = std::mem::replace(&mut self.state, ServiceState::Terminated);
		self.state = match state {
			ServiceState::AwaitingRequest => {
				match self.channel.receive().await? {
					request if request.is_quit() => {
						info!("Quit requested, closing the service");
						self.channel.disconnect().await?;
						ServiceState::Terminated
					}
					Request::Path(path) => ServiceState::Processing(path),
					Request::Malformed(reason) => {
						self.summary.failed += 1;
						warn!("Malformed request: {}", reason);
						self.channel.reply(ERROR_REPLY).await?;
						ServiceState::AwaitingRequest
					}
				}
			}
			ServiceState::Processing(request) => {
				let pipeline = self.pipeline;
				let context = &mut *self.context;
				// Inference and ffmpeg block; keep the socket's tasks running meanwhile.
				let result = tokio::task::block_in_place(|| pipeline.generate_depth(context, &request));
				let reply = match result {
					Ok(output) => {
						self.summary.processed += 1;
						output.to_string_lossy().into_owned()
					}
					Err(e) => {
						self.summary.failed += 1;
						warn!("Request {:?} failed: {}", request, e);
						ERROR_REPLY.to_string()
					}
				};
				self.channel.reply(&reply).await?;
				ServiceState::AwaitingRequest
			}
			ServiceState::Terminated => ServiceState::Terminated,
		};
		Ok(())
	}
}
