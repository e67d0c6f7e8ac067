//! Common test utilities and helpers
//!
//! Provides fake external tools (build tool, signing tool) driven by
//! fixture directories, plus builders for thin and universal binary
//! images, so the whole pipeline runs without a real toolchain.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Route crate logs to the test harness; honors `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const MH_MAGIC: u32 = 0xFEED_FACE;
const MH_MAGIC_64: u32 = 0xFEED_FACF;
const FAT_MAGIC: u32 = 0xCAFE_BABE;
const MH_EXECUTE: u32 = 2;

fn arch_ids(arch: &str) -> (i32, i32, bool) {
    match arch {
        "i386" => (0x7, 3, false),
        "x86_64" => (0x0100_0007, 3, true),
        "armv7" => (12, 9, false),
        "arm64" => (0x0100_000C, 0, true),
        other => panic!("No fixture for architecture '{other}'"),
    }
}

/// Minimal single-architecture executable image
pub fn thin_image(arch: &str) -> Vec<u8> {
    let (cputype, cpusubtype, is_64bit) = arch_ids(arch);
    let magic = if is_64bit { MH_MAGIC_64 } else { MH_MAGIC };

    let mut image = Vec::new();
    image.extend_from_slice(&magic.to_be_bytes());
    image.extend_from_slice(&cputype.to_be_bytes());
    image.extend_from_slice(&cpusubtype.to_be_bytes());
    image.extend_from_slice(&MH_EXECUTE.to_be_bytes());
    image.extend_from_slice(&0u32.to_be_bytes()); // ncmds
    image.extend_from_slice(&0u32.to_be_bytes()); // sizeofcmds
    image.extend_from_slice(&0u32.to_be_bytes()); // flags
    if is_64bit {
        image.extend_from_slice(&0u32.to_be_bytes()); // reserved
    }
    for _ in 0..4 {
        image.extend_from_slice(arch.as_bytes());
    }
    image
}

/// Universal image holding one thin slice per architecture
///
/// Written independently of the crate's own container code so tests
/// cross-check the parser against a second implementation.
pub fn fat_image(archs: &[&str]) -> Vec<u8> {
    let slices: Vec<Vec<u8>> = archs.iter().map(|arch| thin_image(arch)).collect();
    let header_len = 8 + archs.len() * 20;

    let mut offsets = Vec::new();
    let mut cursor = header_len;
    for slice in &slices {
        cursor = (cursor + 15) & !15;
        offsets.push(cursor);
        cursor += slice.len();
    }

    let mut image = Vec::new();
    image.extend_from_slice(&FAT_MAGIC.to_be_bytes());
    image.extend_from_slice(&(archs.len() as u32).to_be_bytes());
    for (arch, (slice, offset)) in archs.iter().zip(slices.iter().zip(&offsets)) {
        let (cputype, cpusubtype, _) = arch_ids(arch);
        image.extend_from_slice(&cputype.to_be_bytes());
        image.extend_from_slice(&cpusubtype.to_be_bytes());
        image.extend_from_slice(&(*offset as u32).to_be_bytes());
        image.extend_from_slice(&(slice.len() as u32).to_be_bytes());
        image.extend_from_slice(&4u32.to_be_bytes());
    }
    for (slice, offset) in slices.iter().zip(&offsets) {
        image.resize(*offset, 0);
        image.extend_from_slice(slice);
    }
    image
}

/// Create `<name>.framework` under `parent` with the given binary payload
pub fn make_framework(parent: &Path, name: &str, binary: &[u8]) -> PathBuf {
    let dir = parent.join(format!("{name}.framework"));
    fs::create_dir_all(&dir).expect("Failed to create framework dir");
    fs::write(dir.join(name), binary).expect("Failed to write framework binary");
    fs::write(dir.join("Info.plist"), "<plist/>").expect("Failed to write framework metadata");
    dir
}

/// Write an executable shell script
pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("Failed to write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .expect("Failed to mark script executable");
}

const BUILD_TOOL_SCRIPT: &str = r#"#!/bin/sh
FIXTURES="@FIXTURES@"
scheme=""; sdk=""; symroot=""; list=0; proj=""
while [ $# -gt 0 ]; do
  case "$1" in
    -list) list=1 ;;
    -project|-workspace) shift; proj="$1" ;;
    -scheme) shift; scheme="$1" ;;
    -sdk) shift; sdk="$1" ;;
    SYMROOT=*) symroot="${1#SYMROOT=}" ;;
  esac
  shift
done
base=$(basename "$proj")
stem="${base%.*}"
if [ "$list" = "1" ]; then
  echo "Information about project \"$stem\":"
  echo "    Schemes:"
  for marker in "$FIXTURES/$stem/schemes/"*; do
    [ -e "$marker" ] || { echo "no schemes for $stem" >&2; exit 64; }
    echo "        $(basename "$marker")"
  done
  echo ""
  exit 0
fi
if [ -e "$FIXTURES/$stem/fail/$scheme" ]; then
  echo "xcodebuild: error: scheme $scheme in $stem is broken" >&2
  exit 70
fi
echo "start $stem $scheme $sdk" >> "$FIXTURES/invocations.log"
if [ -d "$FIXTURES/$stem/sync" ]; then
  touch "$FIXTURES/$stem/sync/$scheme-$sdk.started"
  tries=0
  while [ "$(ls "$FIXTURES/$stem/sync" | wc -l)" -lt 2 ]; do
    tries=$((tries+1))
    if [ "$tries" -gt 100 ]; then
      echo "rendezvous timed out" >&2
      exit 71
    fi
    sleep 0.1
  done
fi
src="$FIXTURES/$stem/$sdk/$scheme"
if [ ! -d "$src" ]; then
  echo "no fixture products at $src" >&2
  exit 65
fi
cp -R "$src/." "$symroot/"
echo "end $stem $scheme $sdk" >> "$FIXTURES/invocations.log"
echo "BUILD SUCCEEDED"
"#;

const SIGNING_TOOL_SCRIPT: &str = r#"#!/bin/sh
mode=""; target=""
while [ $# -gt 0 ]; do
  case "$1" in
    --force|--verbose) ;;
    --sign) mode=sign; shift ;;
    --verify) mode=verify ;;
    *) target="$1" ;;
  esac
  shift
done
name=$(basename "$target")
name="${name%.*}"
binary="$target/$name"
[ -f "$binary" ] || { echo "$target: no binary payload" >&2; exit 66; }
digest=$(cksum "$binary" | cut -d' ' -f1-2)
if [ "$mode" = "sign" ]; then
  printf '%s\n' "$digest" > "$target/_CodeSignature"
  exit 0
fi
if [ -f "$target/_CodeSignature" ] && [ "$(cat "$target/_CodeSignature")" = "$digest" ]; then
  echo "$target: satisfies its Designated Requirement" >&2
  exit 0
fi
echo "$target: invalid or missing signature" >&2
exit 1
"#;

/// A fake build tool driven by a fixtures directory
///
/// Fixture layout, per project descriptor stem:
/// - `<fixtures>/<stem>/schemes/<Scheme>` - marker per discoverable scheme
/// - `<fixtures>/<stem>/<sdk>/<Scheme>/<Name>.framework` - products one
///   build invocation drops into its output folder
/// - `<fixtures>/<stem>/fail/<Scheme>` - marker making the build fail
/// - `<fixtures>/<stem>/sync/` - when present, invocations rendezvous
///   until two of them run concurrently
pub struct FakeBuildTool {
    pub script: PathBuf,
    pub fixtures: PathBuf,
}

impl FakeBuildTool {
    /// Install the fake tool and an empty fixtures directory under `dir`
    pub fn install(dir: &Path) -> Self {
        let fixtures = dir.join("fixtures");
        fs::create_dir_all(&fixtures).expect("Failed to create fixtures dir");
        let script = dir.join("fake-xcodebuild");
        write_script(
            &script,
            &BUILD_TOOL_SCRIPT.replace("@FIXTURES@", &fixtures.display().to_string()),
        );
        Self { script, fixtures }
    }

    /// Register a project: its descriptor in `project_dir` plus fixture
    /// products for every (scheme, artifact) on every SDK
    pub fn add_project(&self, project_dir: &Path, stem: &str, schemes: &[(&str, &[&str])]) {
        fs::create_dir_all(project_dir.join(format!("{stem}.xcodeproj")))
            .expect("Failed to create project descriptor");
        let scheme_markers = self.fixtures.join(stem).join("schemes");
        fs::create_dir_all(&scheme_markers).expect("Failed to create scheme markers dir");
        for (scheme, artifacts) in schemes {
            fs::write(scheme_markers.join(scheme), "").expect("Failed to write scheme marker");
            for (sdk, image) in [
                ("macosx", thin_image("x86_64")),
                ("iphoneos", fat_image(&["armv7", "arm64"])),
                ("iphonesimulator", thin_image("i386")),
            ] {
                let products = self.fixtures.join(stem).join(sdk).join(scheme);
                for artifact in *artifacts {
                    make_framework(&products, artifact, &image);
                }
            }
        }
    }

    /// Make one scheme's build invocations exit non-zero
    pub fn mark_failing(&self, stem: &str, scheme: &str) {
        let fail = self.fixtures.join(stem).join("fail");
        fs::create_dir_all(&fail).expect("Failed to create fail dir");
        fs::write(fail.join(scheme), "").expect("Failed to write fail marker");
    }

    /// Require two invocations of this project to overlap in time
    pub fn require_concurrency(&self, stem: &str) {
        fs::create_dir_all(self.fixtures.join(stem).join("sync"))
            .expect("Failed to create sync dir");
    }

    /// Invocation log lines, start/end per build, in wall-clock order
    pub fn invocation_log(&self) -> Vec<String> {
        fs::read_to_string(self.fixtures.join("invocations.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Install the fake signing tool (checksum-file based) under `dir`
pub fn install_fake_signing_tool(dir: &Path) -> PathBuf {
    let script = dir.join("fake-codesign");
    write_script(&script, SIGNING_TOOL_SCRIPT);
    script
}
