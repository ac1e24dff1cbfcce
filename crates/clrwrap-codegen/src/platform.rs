//! Platform profiles derived from the SDK root the header was produced
//! against. A profile decides the newline convention, the platform block at
//! the top of the declaration file and how the input header is included.

use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformProfile {
    /// No SDK root given.
    Portable,
    Windows,
    Apple,
    /// An SDK root of unknown shape.
    Guarded,
}

impl PlatformProfile {
    pub fn detect(platform_root: Option<&Path>) -> Self {
        let Some(root) = platform_root else {
            return PlatformProfile::Portable;
        };
        let components: Vec<String> = root
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_ascii_lowercase())
            .collect();
        let any = |needles: &[&str]| {
            components
                .iter()
                .any(|c| needles.iter().any(|n| c.contains(n)))
        };

        if any(&["windows.platform", "windows.sdk", "windows kits", "windows sdk"]) {
            PlatformProfile::Windows
        } else if any(&["macosx.platform", "macosx.sdk", "xcode", "iphoneos.sdk"]) {
            PlatformProfile::Apple
        } else {
            PlatformProfile::Guarded
        }
    }

    pub fn newline(self) -> &'static str {
        match self {
            PlatformProfile::Windows => "\r\n",
            _ => "\n",
        }
    }

    /// Lines opening the declaration file after `#pragma once`.
    pub fn prelude(self) -> &'static [&'static str] {
        match self {
            PlatformProfile::Portable | PlatformProfile::Apple => &[],
            PlatformProfile::Windows => &["#define WIN32_LEAN_AND_MEAN", "#include <windows.h>"],
            PlatformProfile::Guarded => &[
                "#if defined(_WIN32)",
                "#define WIN32_LEAN_AND_MEAN",
                "#include <windows.h>",
                "#endif",
            ],
        }
    }

    pub fn include(self, header_file: &str) -> String {
        match self {
            PlatformProfile::Portable => format!("#include \"{header_file}\""),
            _ => format!("#include <{header_file}>"),
        }
    }

    /// Convert LF-terminated text to this profile's newline convention.
    pub fn apply_newlines(self, text: &str) -> String {
        match self.newline() {
            "\n" => text.to_string(),
            newline => text.replace('\n', newline),
        }
    }
}

impl fmt::Display for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlatformProfile::Portable => "portable",
            PlatformProfile::Windows => "windows",
            PlatformProfile::Apple => "apple",
            PlatformProfile::Guarded => "guarded",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection() {
        assert_eq!(PlatformProfile::detect(None), PlatformProfile::Portable);
        assert_eq!(
            PlatformProfile::detect(Some(Path::new(
                "C:/Library/Developer/Platforms/Windows.platform/Developer/SDKs/Windows.sdk"
            ))),
            PlatformProfile::Windows
        );
        assert_eq!(
            PlatformProfile::detect(Some(Path::new(
                "/Applications/Xcode.app/Contents/Developer/Platforms/MacOSX.platform/Developer/SDKs/MacOSX.sdk"
            ))),
            PlatformProfile::Apple
        );
        assert_eq!(
            PlatformProfile::detect(Some(Path::new("/opt/sdk"))),
            PlatformProfile::Guarded
        );
    }

    #[test]
    fn newline_and_include_conventions() {
        assert_eq!(PlatformProfile::Windows.apply_newlines("a\nb\n"), "a\r\nb\r\n");
        assert_eq!(PlatformProfile::Apple.apply_newlines("a\nb\n"), "a\nb\n");
        assert_eq!(PlatformProfile::Portable.include("Api.hpp"), "#include \"Api.hpp\"");
        assert_eq!(PlatformProfile::Windows.include("Api.hpp"), "#include <Api.hpp>");
        assert!(PlatformProfile::Portable.prelude().is_empty());
        assert_eq!(PlatformProfile::Guarded.prelude().first(), Some(&"#if defined(_WIN32)"));
    }
}
