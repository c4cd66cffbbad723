//! Notification strings for the updater.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "zh-TW")]
    ZhTw,
    #[serde(rename = "en")]
    En,
    #[serde(rename = "ja")]
    Ja,
    #[serde(rename = "ko")]
    Ko,
}

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Locale::ZhCn => "zh-CN",
            Locale::ZhTw => "zh-TW",
            Locale::En => "en",
            Locale::Ja => "ja",
            Locale::Ko => "ko",
        }
    }

    pub fn all() -> &'static [Locale] {
        &[Locale::ZhCn, Locale::ZhTw, Locale::En, Locale::Ja, Locale::Ko]
    }
}

impl FromStr for Locale {
    type Err = std::convert::Infallible;

    /// Unknown codes fall back to English.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let found = Locale::all().iter().copied().find(|l| l.code().eq_ignore_ascii_case(s));
        Ok(found.unwrap_or(Locale::En))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    UpToDate,
    ManifestMissing,
    KeyMisconfigured,
    NetworkUnreachable,
    CheckFailed,
    DownloadComplete,
    DownloadFailed,
    InstallComplete,
    InstallFailed,
    RestartManually,
}

impl MessageKey {
    pub fn id(self) -> &'static str {
        match self {
            MessageKey::UpToDate => "update_up_to_date",
            MessageKey::ManifestMissing => "update_manifest_missing",
            MessageKey::KeyMisconfigured => "update_key_misconfigured",
            MessageKey::NetworkUnreachable => "update_network_unreachable",
            MessageKey::CheckFailed => "update_check_failed",
            MessageKey::DownloadComplete => "update_download_complete",
            MessageKey::DownloadFailed => "update_download_failed",
            MessageKey::InstallComplete => "update_install_complete",
            MessageKey::InstallFailed => "update_install_failed",
            MessageKey::RestartManually => "update_restart_manually",
        }
    }

    pub fn all() -> &'static [MessageKey] {
        &[
            MessageKey::UpToDate,
            MessageKey::ManifestMissing,
            MessageKey::KeyMisconfigured,
            MessageKey::NetworkUnreachable,
            MessageKey::CheckFailed,
            MessageKey::DownloadComplete,
            MessageKey::DownloadFailed,
            MessageKey::InstallComplete,
            MessageKey::InstallFailed,
            MessageKey::RestartManually,
        ]
    }
}

/// Maps message keys to user-facing text.
pub trait Localizer: Send + Sync {
    fn text(&self, key: MessageKey) -> String;
}

impl Localizer for Locale {
    fn text(&self, key: MessageKey) -> String {
        translate(*self, key).to_string()
    }
}

fn translate(locale: Locale, key: MessageKey) -> &'static str {
    use MessageKey::*;

    match locale {
        Locale::ZhCn => match key {
            UpToDate => "当前已是最新版本",
            ManifestMissing => "尚未发布更新清单，请稍后再试",
            KeyMisconfigured => "更新签名公钥配置错误",
            NetworkUnreachable => "无法连接更新服务器，请稍后再试",
            CheckFailed => "检查更新失败",
            DownloadComplete => "更新下载完成",
            DownloadFailed => "更新下载失败",
            InstallComplete => "更新安装完成，正在重启",
            InstallFailed => "更新安装失败",
            RestartManually => "请手动重启应用以完成更新",
        },
        Locale::ZhTw => match key {
            UpToDate => "目前已是最新版本",
            ManifestMissing => "尚未發佈更新清單，請稍後再試",
            KeyMisconfigured => "更新簽章公鑰設定錯誤",
            NetworkUnreachable => "無法連線更新伺服器，請稍後再試",
            CheckFailed => "檢查更新失敗",
            DownloadComplete => "更新下載完成",
            DownloadFailed => "更新下載失敗",
            InstallComplete => "更新安裝完成，正在重新啟動",
            InstallFailed => "更新安裝失敗",
            RestartManually => "請手動重新啟動應用程式以完成更新",
        },
        Locale::En => match key {
            UpToDate => "You are up to date",
            ManifestMissing => "No release manifest has been published yet",
            KeyMisconfigured => "Updater public key is misconfigured",
            NetworkUnreachable => "Update server unreachable, please try again later",
            CheckFailed => "Update check failed",
            DownloadComplete => "Update downloaded",
            DownloadFailed => "Update download failed",
            InstallComplete => "Update installed, restarting",
            InstallFailed => "Update install failed",
            RestartManually => "Please restart the app manually to finish updating",
        },
        Locale::Ja => match key {
            UpToDate => "最新バージョンです",
            ManifestMissing => "リリースマニフェストはまだ公開されていません",
            KeyMisconfigured => "アップデーターの公開鍵の設定が正しくありません",
            NetworkUnreachable => "更新サーバーに接続できません。後でもう一度お試しください",
            CheckFailed => "更新の確認に失敗しました",
            DownloadComplete => "更新のダウンロードが完了しました",
            DownloadFailed => "更新のダウンロードに失敗しました",
            InstallComplete => "更新をインストールしました。再起動しています",
            InstallFailed => "更新のインストールに失敗しました",
            RestartManually => "更新を完了するにはアプリを手動で再起動してください",
        },
        Locale::Ko => match key {
            UpToDate => "최신 버전입니다",
            ManifestMissing => "아직 릴리스 매니페스트가 게시되지 않았습니다",
            KeyMisconfigured => "업데이트 공개 키 설정이 잘못되었습니다",
            NetworkUnreachable => "업데이트 서버에 연결할 수 없습니다. 나중에 다시 시도하세요",
            CheckFailed => "업데이트 확인에 실패했습니다",
            DownloadComplete => "업데이트 다운로드가 완료되었습니다",
            DownloadFailed => "업데이트 다운로드에 실패했습니다",
            InstallComplete => "업데이트가 설치되었습니다. 다시 시작합니다",
            InstallFailed => "업데이트 설치에 실패했습니다",
            RestartManually => "업데이트를 완료하려면 앱을 직접 다시 시작하세요",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_locale_codes() {
        assert_eq!("zh-CN".parse::<Locale>().unwrap(), Locale::ZhCn);
        assert_eq!("zh-tw".parse::<Locale>().unwrap(), Locale::ZhTw);
        assert_eq!("ko".parse::<Locale>().unwrap(), Locale::Ko);
    }

    #[test]
    fn unknown_locale_falls_back_to_english() {
        assert_eq!("fr".parse::<Locale>().unwrap(), Locale::En);
    }

    #[test]
    fn every_key_translated_in_every_locale() {
        for locale in Locale::all() {
            for key in MessageKey::all() {
                assert!(!locale.text(*key).is_empty(), "{} missing {}", locale.code(), key.id());
            }
        }
    }

    #[test]
    fn english_up_to_date() {
        assert_eq!(Locale::En.text(MessageKey::UpToDate), "You are up to date");
    }

    #[test]
    fn locale_serde_uses_codes() {
        let json = serde_json::to_string(&Locale::ZhTw).unwrap();
        assert_eq!(json, "\"zh-TW\"");
        let back: Locale = serde_json::from_str("\"ja\"").unwrap();
        assert_eq!(back, Locale::Ja);
    }
}
