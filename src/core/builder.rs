use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    core::{
        admission::AdmissionController,
        commands::CommandLoop,
        dispatcher::Dispatcher,
        listener::RequestListener,
        registry::Registry,
        services::{Parts, TileServices, spawn_fanout},
    },
    delivery::DeliveryQueue,
    error::BuildError,
    events::Bus,
    identity::UserId,
    platform::{CurrentUser, KeyguardState, NoKeyguard, NullShell, PackageResolver, Shell, UserTracker},
    subscribers::{Subscribe, SubscriberSet},
    tiles::ManagerFactory,
};

/// Builder for constructing [`TileServices`] with its collaborators.
///
/// A manager factory and a package resolver are required. The keyguard
/// defaults to "never showing", the user tracker to user 0 and the shell to
/// a no-op.
pub struct TileServicesBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    factory: Option<Arc<dyn ManagerFactory>>,
    packages: Option<Arc<dyn PackageResolver>>,
    keyguard: Arc<dyn KeyguardState>,
    users: Arc<dyn UserTracker>,
    shell: Arc<dyn Shell>,
}

impl TileServicesBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            factory: None,
            packages: None,
            keyguard: Arc::new(NoKeyguard),
            users: Arc::new(CurrentUser::new(UserId(0))),
            shell: Arc::new(NullShell),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (membership, admission, dispatch
    /// rejections) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the factory creating a manager for each added tile.
    pub fn with_manager_factory(mut self, factory: Arc<dyn ManagerFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_package_resolver(mut self, packages: Arc<dyn PackageResolver>) -> Self {
        self.packages = Some(packages);
        self
    }

    pub fn with_keyguard(mut self, keyguard: Arc<dyn KeyguardState>) -> Self {
        self.keyguard = keyguard;
        self
    }

    /// Sets the foreground user source used by listening requests.
    pub fn with_user_tracker(mut self, users: Arc<dyn UserTracker>) -> Self {
        self.users = users;
        self
    }

    /// Sets the shell that receives panel and status icon effects.
    pub fn with_shell(mut self, shell: Arc<dyn Shell>) -> Self {
        self.shell = shell;
        self
    }

    /// Validates the configuration and starts the runtime.
    ///
    /// This consumes the builder and initializes all runtime components:
    /// - Event bus and subscriber workers
    /// - Registry, admission controller, dispatcher and request listener
    /// - Delivery worker for shell side effects
    /// - Command loop
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Arc<TileServices>, BuildError> {
        self.cfg.validate()?;
        let factory = self
            .factory
            .ok_or(BuildError::MissingCollaborator("manager_factory"))?;
        let packages = self
            .packages
            .ok_or(BuildError::MissingCollaborator("package_resolver"))?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let fanout = spawn_fanout(&bus, subs, runtime_token.clone());

        let registry = Registry::new();
        let admission = Arc::new(AdmissionController::new(
            registry.clone(),
            &self.cfg,
            bus.clone(),
        ));
        let listener = Arc::new(RequestListener::new(
            registry.clone(),
            self.users,
            bus.clone(),
        ));
        let (delivery, delivery_worker) = DeliveryQueue::spawn(
            self.shell,
            self.cfg.delivery_queue_capacity_clamped(),
            bus.clone(),
            runtime_token.clone(),
        );
        let dispatcher = Dispatcher::new(
            registry.clone(),
            packages,
            self.keyguard,
            delivery.clone(),
            bus.clone(),
        );

        let (commands, handle) = CommandLoop::new(
            admission.clone(),
            listener.clone(),
            self.cfg.command_queue_capacity_clamped(),
        );
        let command_worker = commands.run(runtime_token.clone());

        tracing::debug!(
            normal = self.cfg.normal_capacity,
            reduced = self.cfg.reduced_capacity,
            "tile services started"
        );
        Ok(Arc::new(TileServices::from_parts(Parts {
            cfg: self.cfg,
            bus,
            registry,
            admission,
            listener,
            dispatcher,
            factory,
            delivery,
            handle,
            runtime_token,
            workers: vec![command_worker, delivery_worker, fanout],
        })))
    }
}
