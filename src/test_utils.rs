//! Test utilities
//!
//! Fixture builders for minimal thin binary images used by container tests.

#[cfg(test)]
pub mod fixtures {
    const MH_MAGIC: u32 = 0xFEED_FACE;
    const MH_MAGIC_64: u32 = 0xFEED_FACF;
    const MH_EXECUTE: u32 = 2;

    /// (cputype, cpusubtype, 64-bit) triples for the architectures the
    /// crate knows about
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
        thin_image_with_filetype(arch, MH_EXECUTE)
    }

    /// Minimal single-architecture image with an explicit filetype
    pub fn thin_image_with_filetype(arch: &str, filetype: u32) -> Vec<u8> {
        let (cputype, cpusubtype, is_64bit) = arch_ids(arch);
        let magic = if is_64bit { MH_MAGIC_64 } else { MH_MAGIC };

        let mut image = Vec::new();
        image.extend_from_slice(&magic.to_be_bytes());
        image.extend_from_slice(&cputype.to_be_bytes());
        image.extend_from_slice(&cpusubtype.to_be_bytes());
        image.extend_from_slice(&filetype.to_be_bytes());
        image.extend_from_slice(&0u32.to_be_bytes()); // ncmds
        image.extend_from_slice(&0u32.to_be_bytes()); // sizeofcmds
        image.extend_from_slice(&0u32.to_be_bytes()); // flags
        if is_64bit {
            image.extend_from_slice(&0u32.to_be_bytes()); // reserved
        }
        // Distinct payload per architecture, so slice bytes are comparable
        for _ in 0..4 {
            image.extend_from_slice(arch.as_bytes());
        }
        image
    }
}
