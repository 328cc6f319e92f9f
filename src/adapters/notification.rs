//! Notifications (connections).

use crate::fields::{Family, FieldAttr, FieldDef, FieldType, Implementation};
use crate::resource::Endpoint;
use crate::schema::{Attribute, AttributeFlags, AttributeType};

use super::TableAdapter;

const ATTRIBUTES: &[FieldAttr] = &[
    FieldAttr::new("web_hook_url", FieldType::String).sensitive(),
    FieldAttr::new("url", FieldType::String),
    FieldAttr::new("method", FieldType::Int),
    FieldAttr::new("server", FieldType::String),
    FieldAttr::new("server_url", FieldType::String),
    FieldAttr::new("host", FieldType::String),
    FieldAttr::new("port", FieldType::Int),
    FieldAttr::new("use_ssl", FieldType::Bool),
    FieldAttr::new("require_encryption", FieldType::Bool),
    FieldAttr::new("username", FieldType::String),
    FieldAttr::new("password", FieldType::String).sensitive(),
    FieldAttr::new("api_key", FieldType::String).sensitive(),
    FieldAttr::new("app_token", FieldType::String).sensitive(),
    FieldAttr::new("auth_token", FieldType::String).sensitive(),
    FieldAttr::new("access_token", FieldType::String).sensitive(),
    FieldAttr::new("bot_token", FieldType::String).sensitive(),
    FieldAttr::new("user_key", FieldType::String).sensitive(),
    FieldAttr::new("configuration_key", FieldType::String).sensitive(),
    FieldAttr::new("avatar", FieldType::String),
    FieldAttr::new("author", FieldType::String),
    FieldAttr::new("icon", FieldType::String),
    FieldAttr::new("channel", FieldType::String),
    FieldAttr::new("chat_id", FieldType::String),
    FieldAttr::new("topic_id", FieldType::Int),
    FieldAttr::new("send_silently", FieldType::Bool),
    FieldAttr::new("from", FieldType::String),
    FieldAttr::new("to", FieldType::StringSet),
    FieldAttr::new("cc", FieldType::StringSet),
    FieldAttr::new("bcc", FieldType::StringSet),
    FieldAttr::new("devices", FieldType::StringSet),
    FieldAttr::new("topics", FieldType::StringSet),
    FieldAttr::new("priority", FieldType::Int),
    FieldAttr::new("sound", FieldType::String),
    FieldAttr::new("notification_type", FieldType::Int),
    FieldAttr::new("path", FieldType::String),
    FieldAttr::new("arguments", FieldType::String),
    FieldAttr::new("notify", FieldType::Bool),
    FieldAttr::new("update_library", FieldType::Bool),
    FieldAttr::new("clean_library", FieldType::Bool),
    FieldAttr::new("always_update", FieldType::Bool),
    FieldAttr::new("display_time", FieldType::Int),
];

/// Notification implementations.
pub static NOTIFICATIONS: Family = Family {
    kind: "notification",
    attributes: ATTRIBUTES,
    implementations: &[
        Implementation {
            name: "Discord",
            config_contract: "DiscordSettings",
            fields: &[
                FieldDef::new("web_hook_url", "webHookUrl").required(),
                FieldDef::new("username", "username"),
                FieldDef::new("avatar", "avatar"),
                FieldDef::new("author", "author"),
            ],
        },
        Implementation {
            name: "Email",
            config_contract: "EmailSettings",
            fields: &[
                FieldDef::new("server", "server").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("require_encryption", "requireEncryption"),
                FieldDef::new("username", "username"),
                FieldDef::new("password", "password"),
                FieldDef::new("from", "from").required(),
                FieldDef::new("to", "to").required(),
                FieldDef::new("cc", "cc"),
                FieldDef::new("bcc", "bcc"),
            ],
        },
        Implementation {
            name: "Webhook",
            config_contract: "WebhookSettings",
            fields: &[
                FieldDef::new("url", "url").required(),
                FieldDef::new("method", "method"),
                FieldDef::new("username", "username"),
                FieldDef::new("password", "password"),
            ],
        },
        Implementation {
            name: "Telegram",
            config_contract: "TelegramSettings",
            fields: &[
                FieldDef::new("bot_token", "botToken").required(),
                FieldDef::new("chat_id", "chatId").required(),
                FieldDef::new("topic_id", "topicId"),
                FieldDef::new("send_silently", "sendSilently"),
            ],
        },
        Implementation {
            name: "Slack",
            config_contract: "SlackSettings",
            fields: &[
                FieldDef::new("web_hook_url", "webHookUrl").required(),
                FieldDef::new("username", "username"),
                FieldDef::new("icon", "icon"),
                FieldDef::new("channel", "channel"),
            ],
        },
        Implementation {
            name: "Pushover",
            config_contract: "PushoverSettings",
            fields: &[
                FieldDef::new("api_key", "apiKey").required(),
                FieldDef::new("user_key", "userKey").required(),
                FieldDef::new("devices", "devices"),
                FieldDef::new("priority", "priority"),
                FieldDef::new("sound", "sound"),
            ],
        },
        Implementation {
            name: "Gotify",
            config_contract: "GotifySettings",
            fields: &[
                FieldDef::new("server", "server").required(),
                FieldDef::new("app_token", "appToken").required(),
                FieldDef::new("priority", "priority"),
            ],
        },
        Implementation {
            name: "CustomScript",
            config_contract: "CustomScriptSettings",
            fields: &[
                FieldDef::new("path", "path").required(),
                FieldDef::new("arguments", "arguments"),
            ],
        },
        Implementation {
            name: "PlexServer",
            config_contract: "PlexServerSettings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("auth_token", "authToken"),
                FieldDef::new("update_library", "updateLibrary"),
            ],
        },
        Implementation {
            name: "MediaBrowser",
            config_contract: "MediaBrowserSettings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("api_key", "apiKey"),
                FieldDef::new("notify", "notify"),
                FieldDef::new("update_library", "updateLibrary"),
            ],
        },
        Implementation {
            name: "Xbmc",
            config_contract: "XbmcSettings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("username", "username"),
                FieldDef::new("password", "password"),
                FieldDef::new("display_time", "displayTime"),
                FieldDef::new("notify", "notify"),
                FieldDef::new("update_library", "updateLibrary"),
                FieldDef::new("clean_library", "cleanLibrary"),
                FieldDef::new("always_update", "alwaysUpdate"),
            ],
        },
        Implementation {
            name: "Ntfy",
            config_contract: "NtfySettings",
            fields: &[
                FieldDef::new("server_url", "serverUrl"),
                FieldDef::new("access_token", "accessToken"),
                FieldDef::new("username", "userName"),
                FieldDef::new("password", "password"),
                FieldDef::new("priority", "priority"),
                FieldDef::new("topics", "topics").required(),
            ],
        },
        Implementation {
            name: "Apprise",
            config_contract: "AppriseSettings",
            fields: &[
                FieldDef::new("server_url", "serverUrl").required(),
                FieldDef::new("configuration_key", "configurationKey"),
                FieldDef::new("notification_type", "notificationType"),
                FieldDef::new("username", "authUsername"),
                FieldDef::new("password", "authPassword"),
            ],
        },
    ],
};

/// `sonarr_notification`.
pub fn notification() -> TableAdapter {
    let trigger = || Attribute::optional_bool().computed();
    TableAdapter::new(
        "sonarr_notification",
        Endpoint::managed("/api/v3/notification"),
        "Notification resource.",
    )
    .column("name", Attribute::required_string().with_description("Notification name."))
    .column("on_grab", trigger())
    .column("on_download", trigger())
    .column("on_upgrade", trigger())
    .column("on_rename", trigger())
    .column("on_series_add", trigger())
    .column("on_series_delete", trigger())
    .column("on_episode_file_delete", trigger())
    .column("on_episode_file_delete_for_upgrade", trigger())
    .column("on_health_issue", trigger())
    .column("on_health_restored", trigger())
    .column("on_application_update", trigger())
    .column("on_manual_interaction_required", trigger())
    .column("include_health_warnings", trigger())
    .column(
        "tags",
        Attribute::new(AttributeType::set(AttributeType::Int64), AttributeFlags::optional_computed()),
    )
    .family(&NOTIFICATIONS)
    .keyed_by("name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{self, ResourceAdapter};
    use crate::testing::FakeSonarr;
    use crate::value::{State, Value};

    fn webhook() -> State {
        State::new()
            .with("name", "hook")
            .with("implementation", "Webhook")
            .with("url", "https://hooks.example/sonarr")
            .with("method", 1)
            .with("password", "hunter2")
            .with("on_grab", true)
    }

    #[test]
    fn test_email_recipients_are_sets() {
        let adapter = notification();
        assert_eq!(
            adapter.schema().attribute("to").unwrap().attr_type,
            AttributeType::set(AttributeType::String)
        );
        let state = State::new()
            .with("name", "mail")
            .with("implementation", "Email")
            .with("server", "smtp.example")
            .with("from", "sonarr@example")
            .with("to", Value::Set(vec![Value::from("me@example")]));
        assert!(adapter.validate(&state).is_empty());
    }

    #[tokio::test]
    async fn test_drift_on_trigger_is_detected() {
        let fake = FakeSonarr::new();
        fake.mask_field("password");
        let api = fake.api();
        let adapter = notification();

        let created = resource::create(&api, &adapter, &webhook()).await.unwrap();
        assert_eq!(created.str("password"), Some("hunter2"));
        let id = created.id().unwrap();

        let mut drifted = adapter.to_api(&created.clone().with("on_grab", false)).unwrap();
        drifted["id"] = serde_json::json!(id);
        fake.put_entity("/api/v3/notification", drifted);

        let refreshed = resource::read(&api, &adapter, &created).await.unwrap().unwrap();
        assert_eq!(refreshed.bool("on_grab"), Some(false));
        assert_eq!(refreshed.str("password"), Some("hunter2"));

        let repaired = resource::update(&api, &adapter, &refreshed, &created).await.unwrap();
        assert_eq!(repaired.bool("on_grab"), Some(true));
    }
}
