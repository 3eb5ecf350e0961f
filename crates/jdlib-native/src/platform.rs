//! Host platform detection and the bundled library path for each platform.

use crate::library::LoadError;

/// Base name of the native library before platform decoration.
pub const LIBRARY_NAME: &str = "Jdlib";

/// Root of the bundled native libraries inside a resource bundle.
pub const RESOURCE_ROOT: &str = "native";

/// A platform family the bundled library is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Platform of the running process.
    pub fn detect() -> Result<Self, LoadError> {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Classify an operating-system name ("linux", "macos", "Mac OS X",
    /// "Windows 10", ...) by case-insensitive containment.
    pub fn from_os_name(os: &str) -> Result<Self, LoadError> {
        let lower = os.to_lowercase();
        if lower.contains("linux") {
            Ok(Platform::Linux)
        } else if lower.contains("mac") {
            Ok(Platform::MacOs)
        } else if lower.contains("windows") {
            Ok(Platform::Windows)
        } else {
            Err(LoadError::UnsupportedPlatform(os.to_string()))
        }
    }

    /// Directory under [`RESOURCE_ROOT`] holding this platform's build.
    pub fn resource_dir(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macosx",
            Platform::Windows => "windows",
        }
    }

    /// File-name suffix of a shared library, including the dot.
    pub fn library_suffix(&self) -> &'static str {
        match self {
            Platform::Linux => ".so",
            Platform::MacOs => ".dylib",
            Platform::Windows => ".dll",
        }
    }

    /// `libJdlib.so`, `libJdlib.dylib` or `Jdlib.dll`.
    pub fn library_file_name(&self) -> String {
        let prefix = match self {
            Platform::Windows => "",
            Platform::Linux | Platform::MacOs => "lib",
        };
        format!("{prefix}{LIBRARY_NAME}{}", self.library_suffix())
    }

    /// Logical `/`-separated path of the bundled library, e.g.
    /// `native/linux/libJdlib.so`.
    pub fn resource_path(&self) -> String {
        format!(
            "{RESOURCE_ROOT}/{}/{}",
            self.resource_dir(),
            self.library_file_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_platform_names() {
        for (name, expected) in [
            ("linux", Platform::Linux),
            ("Linux", Platform::Linux),
            ("macos", Platform::MacOs),
            ("Mac OS X", Platform::MacOs),
            ("windows", Platform::Windows),
            ("Windows 10", Platform::Windows),
        ] {
            assert_eq!(Platform::from_os_name(name).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(Platform::Linux.resource_path(), "native/linux/libJdlib.so");
        assert_eq!(Platform::MacOs.resource_path(), "native/macosx/libJdlib.dylib");
        assert_eq!(Platform::Windows.resource_path(), "native/windows/Jdlib.dll");
    }

    #[test]
    fn test_unsupported_platform_names_the_os() {
        let err = Platform::from_os_name("FreeBSD").unwrap_err();
        assert!(matches!(&err, LoadError::UnsupportedPlatform(os) if os == "FreeBSD"));
        assert!(err.to_string().contains("FreeBSD"));
    }

    #[test]
    #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
    fn test_detect_on_supported_host() {
        let platform = Platform::detect().unwrap();
        assert!(platform.resource_path().starts_with("native/"));
    }
}
