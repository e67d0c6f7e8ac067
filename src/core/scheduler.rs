//! Ordered-yet-concurrent build execution
//!
//! Dependencies build strictly in the caller-supplied order, one full
//! project at a time, so later builds can read artifacts earlier ones left
//! in the shared build folder. Within one project, schemes fan out as
//! concurrent tasks and fan back in before the project counts as built.
//! The first failure aborts the run; nothing is retried.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::defaults;
use crate::core::identifier::{ProjectIdentifier, Scheme};
use crate::core::locator::{self, ProjectLocator};
use crate::core::platform::Platform;
use crate::error::{MergeError, SchedulerError, UnibuildError};
use crate::infra::bundle::ArtifactBundle;
use crate::infra::toolchain::Toolchain;
use crate::infra::{fat, filesystem};

/// Emitted once per scheme as its build is dispatched
///
/// Emission order within a project reflects schedule order, not completion
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEvent {
    /// Project the scheme belongs to
    pub project: ProjectIdentifier,
    /// Scheme being built
    pub scheme: Scheme,
}

impl std::fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Building scheme \"{}\" in {}", self.scheme, self.project)
    }
}

/// Progress events, raw tool output, and one terminal outcome for a
/// scheduled build
///
/// Consumers may poll [`BuildStream::next_event`] for progress and
/// [`BuildStream::next_output_line`] for the build tool's output as it
/// arrives, or call [`BuildStream::wait`] to drain everything and collect
/// the outcome. A consumer reading events alone should interleave output
/// reads (or finish with `wait`, which drains both channels).
/// Dropping the stream neither aborts nor detaches cleanly-started work;
/// the run finishes in the background.
#[derive(Debug)]
pub struct BuildStream {
    events: mpsc::Receiver<BuildEvent>,
    output: mpsc::Receiver<String>,
    outcome: JoinHandle<Result<(), UnibuildError>>,
}

impl futures::Stream for BuildStream {
    type Item = BuildEvent;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<BuildEvent>> {
        self.events.poll_recv(cx)
    }
}

impl BuildStream {
    /// Next progress event, or `None` once all events are delivered
    pub async fn next_event(&mut self) -> Option<BuildEvent> {
        self.events.recv().await
    }

    /// Next line of build tool output, or `None` once the run has finished
    /// producing output
    pub async fn next_output_line(&mut self) -> Option<String> {
        self.output.recv().await
    }

    /// Drain all events and output, block until the terminal outcome
    pub async fn wait(mut self) -> Result<Vec<BuildEvent>, UnibuildError> {
        let mut events = Vec::new();
        let mut events_open = true;
        let mut output_open = true;
        // Both channels drain together so neither can back up and stall
        // the running build
        while events_open || output_open {
            tokio::select! {
                event = self.events.recv(), if events_open => match event {
                    Some(event) => events.push(event),
                    None => events_open = false,
                },
                line = self.output.recv(), if output_open => match line {
                    Some(_) => {}
                    None => output_open = false,
                },
            }
        }
        match self.outcome.await {
            Ok(Ok(())) => Ok(events),
            Ok(Err(error)) => Err(error),
            Err(join_error) => Err(SchedulerError::Aborted {
                error: join_error.to_string(),
            }
            .into()),
        }
    }
}

/// Sequences dependency builds and drives per-scheme concurrency
#[derive(Debug, Clone)]
pub struct Scheduler {
    toolchain: Toolchain,
    configuration: String,
    platforms: Vec<Platform>,
}

impl Scheduler {
    /// Create a scheduler building all platforms with one configuration
    pub fn new(toolchain: Toolchain, configuration: impl Into<String>) -> Self {
        Self {
            toolchain,
            configuration: configuration.into(),
            platforms: Platform::all(),
        }
    }

    /// Restrict the platforms built per scheme
    #[must_use]
    pub fn with_platforms(mut self, platforms: Vec<Platform>) -> Self {
        self.platforms = platforms;
        self
    }

    /// Build every dependency in order, then the top-level project at `root`
    ///
    /// Dependency N+1 does not start until dependency N's full build has
    /// completed successfully. All artifacts land under the shared
    /// `<root>/Build` folder.
    pub fn build_all(&self, dependencies: &[ProjectIdentifier], root: &Path) -> BuildStream {
        let scheduler = self.clone();
        let dependencies = dependencies.to_vec();
        let root = root.to_path_buf();
        let (events, stream_events) = mpsc::channel(defaults::EVENT_CHANNEL_CAPACITY);
        let (output, stream_output) = mpsc::channel(defaults::OUTPUT_CHANNEL_CAPACITY);
        let outcome = tokio::spawn(async move {
            for dependency in &dependencies {
                scheduler
                    .run_dependency(dependency, &root, &events, &output)
                    .await?;
            }
            let project = ProjectIdentifier::RemoteUrl {
                url: root.display().to_string(),
            };
            scheduler
                .run_project(project, &root, &root, &events, &output)
                .await
        });
        BuildStream {
            events: stream_events,
            output: stream_output,
            outcome,
        }
    }

    /// Build one dependency whose checkout lives under `base_dir`
    pub fn build_dependency(
        &self,
        dependency: &ProjectIdentifier,
        base_dir: &Path,
    ) -> BuildStream {
        let scheduler = self.clone();
        let dependency = dependency.clone();
        let base_dir = base_dir.to_path_buf();
        let (events, stream_events) = mpsc::channel(defaults::EVENT_CHANNEL_CAPACITY);
        let (output, stream_output) = mpsc::channel(defaults::OUTPUT_CHANNEL_CAPACITY);
        let outcome = tokio::spawn(async move {
            scheduler
                .run_dependency(&dependency, &base_dir, &events, &output)
                .await
        });
        BuildStream {
            events: stream_events,
            output: stream_output,
            outcome,
        }
    }

    /// Build the project located in `directory`, attributing events to
    /// `project`
    pub fn build_in_directory(&self, project: ProjectIdentifier, directory: &Path) -> BuildStream {
        let scheduler = self.clone();
        let directory = directory.to_path_buf();
        let (events, stream_events) = mpsc::channel(defaults::EVENT_CHANNEL_CAPACITY);
        let (output, stream_output) = mpsc::channel(defaults::OUTPUT_CHANNEL_CAPACITY);
        let outcome = tokio::spawn(async move {
            scheduler
                .run_project(project, &directory, &directory, &events, &output)
                .await
        });
        BuildStream {
            events: stream_events,
            output: stream_output,
            outcome,
        }
    }

    async fn run_dependency(
        &self,
        dependency: &ProjectIdentifier,
        base_dir: &Path,
        events: &mpsc::Sender<BuildEvent>,
        output: &mpsc::Sender<String>,
    ) -> Result<(), UnibuildError> {
        if matches!(dependency, ProjectIdentifier::PrebuiltBinary { .. }) {
            tracing::info!("Skipping prebuilt dependency {dependency}");
            return Ok(());
        }
        let checkout = base_dir
            .join(defaults::CHECKOUTS_FOLDER_NAME)
            .join(dependency.name());
        self.run_project(dependency.clone(), &checkout, base_dir, events, output)
            .await
    }

    /// Build every scheme of one project, artifacts under `output_root`
    async fn run_project(
        &self,
        project: ProjectIdentifier,
        directory: &Path,
        output_root: &Path,
        events: &mpsc::Sender<BuildEvent>,
        output: &mpsc::Sender<String>,
    ) -> Result<(), UnibuildError> {
        let project_error = |source: UnibuildError| {
            UnibuildError::from(SchedulerError::ProjectFailed {
                project: project.name(),
                source: Box::new(source),
            })
        };

        let locator = locator::locate_project(directory).map_err(|e| project_error(e.into()))?;
        tracing::info!("Building {project} from {locator}");
        let schemes = self
            .toolchain
            .list_schemes(&locator)
            .await
            .map_err(|e| project_error(e.into()))?;
        if schemes.is_empty() {
            return Err(project_error(
                SchedulerError::NoSchemes {
                    path: locator.path().to_path_buf(),
                }
                .into(),
            ));
        }

        // Fan out one task per scheme; events go out in schedule order.
        // Concurrent schemes may not claim the same artifact destination.
        let claimed = Arc::new(Mutex::new(HashSet::new()));
        let mut tasks = JoinSet::new();
        for scheme in schemes {
            let event = BuildEvent {
                project: project.clone(),
                scheme: scheme.clone(),
            };
            // A departed consumer only stops progress reporting
            let _ = events.send(event).await;

            let scheduler = self.clone();
            let locator = locator.clone();
            let output_root = output_root.to_path_buf();
            let output = output.clone();
            let claimed = Arc::clone(&claimed);
            tasks.spawn(async move {
                let result = scheduler
                    .build_scheme(&locator, &scheme, &output_root, &output, &claimed)
                    .await;
                (scheme, result)
            });
        }

        // Fan in; the first failure aborts the remaining scheme tasks
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((scheme, Err(error))) => {
                    return Err(SchedulerError::SchemeFailed {
                        project: project.name(),
                        scheme: scheme.to_string(),
                        source: Box::new(error),
                    }
                    .into());
                }
                Err(join_error) => {
                    return Err(SchedulerError::Aborted {
                        error: join_error.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Build one scheme across all scheduled platforms
    async fn build_scheme(
        &self,
        locator: &ProjectLocator,
        scheme: &Scheme,
        output_root: &Path,
        output: &mpsc::Sender<String>,
        claimed: &Mutex<HashSet<PathBuf>>,
    ) -> Result<(), UnibuildError> {
        for platform in &self.platforms {
            self.build_platform(locator, scheme, *platform, output_root, output, claimed)
                .await?;
        }
        Ok(())
    }

    /// Run the per-SDK invocations of one platform and assemble artifacts
    async fn build_platform(
        &self,
        locator: &ProjectLocator,
        scheme: &Scheme,
        platform: Platform,
        output_root: &Path,
        output: &mpsc::Sender<String>,
        claimed: &Mutex<HashSet<PathBuf>>,
    ) -> Result<(), UnibuildError> {
        let build_root = output_root.join(defaults::BUILD_FOLDER_NAME);

        // One invocation per SDK, each into its own products folder
        let mut produced: Vec<Vec<ArtifactBundle>> = Vec::new();
        for sdk in platform.sdks() {
            let products_dir = build_root
                .join(defaults::PRODUCTS_FOLDER_NAME)
                .join(format!("{scheme}-{}", sdk.name()));
            // Stale products from a previous run must not leak into this one
            filesystem::remove_dir_all(&products_dir)?;
            filesystem::create_dir_all(&products_dir)?;
            self.toolchain
                .invoke(
                    locator,
                    scheme,
                    *sdk,
                    &self.configuration,
                    &products_dir,
                    Some(output.clone()),
                )
                .await?;
            let bundles = filesystem::children_with_extension(
                &products_dir,
                defaults::ARTIFACT_EXTENSION,
            )?
            .into_iter()
            .map(ArtifactBundle::new)
            .collect::<Vec<_>>();
            produced.push(bundles);
        }
        if produced.iter().all(Vec::is_empty) {
            return Err(SchedulerError::MissingArtifact {
                scheme: scheme.to_string(),
                platform: platform.name().to_string(),
            }
            .into());
        }

        // Bundles with the same name across SDKs merge into one universal
        // artifact under the platform folder
        let mut names: Vec<String> = produced
            .iter()
            .flatten()
            .map(ArtifactBundle::name)
            .collect();
        names.sort();
        names.dedup();
        for name in names {
            let slices: Vec<&ArtifactBundle> = produced
                .iter()
                .flatten()
                .filter(|bundle| bundle.name() == name)
                .collect();
            let destination = build_root.join(platform.name()).join(format!(
                "{name}.{}",
                defaults::ARTIFACT_EXTENSION
            ));
            if !claimed.lock().await.insert(destination.clone()) {
                return Err(SchedulerError::ArtifactCollision {
                    name,
                    platform: platform.name().to_string(),
                }
                .into());
            }
            assemble_artifact(&slices, &destination, platform)?;
        }
        Ok(())
    }
}

/// Merge per-SDK bundles into the destination and verify its slices
fn assemble_artifact(
    slices: &[&ArtifactBundle],
    destination: &Path,
    platform: Platform,
) -> Result<(), UnibuildError> {
    let Some(first) = slices.first() else {
        return Ok(());
    };
    filesystem::remove_dir_all(destination)?;
    first.copy_to(destination)?;
    let merged = ArtifactBundle::new(destination);
    if slices.len() > 1 {
        let inputs: Vec<PathBuf> = slices.iter().map(|b| b.binary_path()).collect();
        fat::merge(&inputs, &merged.binary_path())?;
    }

    let expected = platform.architectures();
    let actual = merged.architectures()?;
    if actual != expected {
        return Err(MergeError::UnexpectedArchitectures { expected, actual }.into());
    }
    tracing::info!(
        "Assembled '{}' with architectures {actual:?}",
        destination.display()
    );
    Ok(())
}
