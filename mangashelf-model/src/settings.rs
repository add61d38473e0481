use std::path::PathBuf;

/// Media root used as the library folder on Android devices.
pub const ANDROID_MEDIA_ROOT: &str = "/storage/emulated/0/Android/media";

/// Viewer configuration persisted on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ViewerSettings {
    /// Shows the "page X of Y" readout while reading.
    pub show_page_indicator: bool,
    /// Gap in pixels handed to the page renderer.
    pub distance_between_pages: u32,
    /// Root the library scanner opens first.
    #[cfg_attr(feature = "serde", serde(alias = "defaultPDFFolder"))]
    pub default_library_folder: PathBuf,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self::with_library_folder(ANDROID_MEDIA_ROOT)
    }
}

impl ViewerSettings {
    pub fn with_library_folder(folder: impl Into<PathBuf>) -> Self {
        Self {
            show_page_indicator: true,
            distance_between_pages: 0,
            default_library_folder: folder.into(),
        }
    }

    /// Returns a copy with every field set in `patch` overridden.
    pub fn merged(&self, patch: &ViewerSettingsPatch) -> Self {
        Self {
            show_page_indicator: patch
                .show_page_indicator
                .unwrap_or(self.show_page_indicator),
            distance_between_pages: patch
                .distance_between_pages
                .unwrap_or(self.distance_between_pages),
            default_library_folder: patch
                .default_library_folder
                .clone()
                .unwrap_or_else(|| self.default_library_folder.clone()),
        }
    }
}

/// Partial settings update; unset fields keep their current value.
///
/// Also the shape persisted blobs are read into, so fields added later
/// backfill from defaults for blobs written by older versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ViewerSettingsPatch {
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub show_page_indicator: Option<bool>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub distance_between_pages: Option<u32>,
    #[cfg_attr(
        feature = "serde",
        serde(
            alias = "defaultPDFFolder",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub default_library_folder: Option<PathBuf>,
}

impl ViewerSettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.show_page_indicator.is_none()
            && self.distance_between_pages.is_none()
            && self.default_library_folder.is_none()
    }
}

impl From<ViewerSettings> for ViewerSettingsPatch {
    fn from(settings: ViewerSettings) -> Self {
        Self {
            show_page_indicator: Some(settings.show_page_indicator),
            distance_between_pages: Some(settings.distance_between_pages),
            default_library_folder: Some(settings.default_library_folder),
        }
    }
}
