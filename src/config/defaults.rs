//! Default configuration values

/// Folder under a project root holding built artifacts, one subfolder
/// per platform
pub const BUILD_FOLDER_NAME: &str = "Build";

/// Folder under a project root holding checked-out dependency sources
pub const CHECKOUTS_FOLDER_NAME: &str = "Checkouts";

/// Scratch folder inside the build folder for per-invocation tool products
pub const PRODUCTS_FOLDER_NAME: &str = ".products";

/// Extension of artifact bundles produced by the build tool
pub const ARTIFACT_EXTENSION: &str = "framework";

/// Extension of workspace descriptors
pub const WORKSPACE_EXTENSION: &str = "xcworkspace";

/// Extension of project descriptors
pub const PROJECT_EXTENSION: &str = "xcodeproj";

/// External build tool, resolved through PATH unless overridden
pub const DEFAULT_BUILD_TOOL: &str = "xcodebuild";

/// External signing tool, resolved through PATH unless overridden
pub const DEFAULT_SIGNING_TOOL: &str = "codesign";

/// Identity string selecting ad-hoc signing
pub const ADHOC_IDENTITY: &str = "-";

/// Phrase the signing tool prints when a signature verifies
pub const VERIFY_AFFIRMATIVE_PHRASE: &str = "satisfies its Designated Requirement";

/// Capacity of the build event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the build tool output line channel
pub const OUTPUT_CHANNEL_CAPACITY: usize = 256;
