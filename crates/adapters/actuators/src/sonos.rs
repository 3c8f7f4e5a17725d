//! Sonos speakers through the Sonos HTTP API.
//!
//! - `GET <base>/<room>/say/<text>` speaks and resumes the interrupted track
//! - `GET <base>/<room>/playlists` lists the saved playlists
//! - `GET <base>/<room>/playlist/<name>` replaces the queue and plays

use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::{Client, Response, Url};

use smarthome_app::ports::Speech;
use smarthome_domain::error::HomeError;
use smarthome_domain::rule::ANY_PLAYLIST;

use crate::config::SonosConfig;
use crate::error::ActuatorError;
use crate::http;

const SERVICE: &str = "sonos";

pub struct SonosSpeech {
    client: Client,
    base: Url,
}

impl SonosSpeech {
    /// # Errors
    ///
    /// Returns [`ActuatorError::InvalidBaseUrl`] if the base URL is unusable.
    pub fn new(client: Client, config: &SonosConfig) -> Result<Self, ActuatorError> {
        Ok(Self {
            client,
            base: http::base_url(&config.base_url)?,
        })
    }

    fn say_url(&self, room: &str, text: &str) -> Result<Url, ActuatorError> {
        http::endpoint(&self.base, &[room, "say", text])
    }

    fn playlists_url(&self, room: &str) -> Result<Url, ActuatorError> {
        http::endpoint(&self.base, &[room, "playlists"])
    }

    fn playlist_url(&self, room: &str, name: &str) -> Result<Url, ActuatorError> {
        http::endpoint(&self.base, &[room, "playlist", name])
    }

    async fn get(&self, url: Url) -> Result<Response, ActuatorError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ActuatorError::Request {
                service: SERVICE,
                source,
            })?;
        http::check_status(SERVICE, &response)?;
        Ok(response)
    }
}

impl Speech for SonosSpeech {
    async fn speak(&self, target: &str, text: &str) -> Result<(), HomeError> {
        let url = self.say_url(target, text)?;
        tracing::debug!(room = target, text, "speaking");
        self.get(url).await?;
        Ok(())
    }

    async fn play_playlist(&self, target: &str, playlist: &str) -> Result<(), HomeError> {
        let saved: Vec<String> = self
            .get(self.playlists_url(target)?)
            .await?
            .json()
            .await
            .map_err(|source| ActuatorError::Request {
                service: SERVICE,
                source,
            })?;
        let picked = {
            let mut rng = rand::thread_rng();
            pick_playlist(&saved, playlist, &mut rng).map(str::to_owned)
        };
        let Some(name) = picked else {
            return Err(ActuatorError::Rejected {
                service: SERVICE,
                reason: format!("no saved playlist matches {playlist:?}"),
            }
            .into());
        };

        tracing::debug!(room = target, playlist = %name, "playing playlist");
        self.get(self.playlist_url(target, &name)?).await?;
        Ok(())
    }
}

/// First saved playlist whose name contains `wanted`, or a random one for
/// [`ANY_PLAYLIST`].
fn pick_playlist<'a>(saved: &'a [String], wanted: &str, rng: &mut impl Rng) -> Option<&'a str> {
    if wanted.eq_ignore_ascii_case(ANY_PLAYLIST) {
        return saved.choose(rng).map(String::as_str);
    }
    saved
        .iter()
        .find(|name| name.contains(wanted))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn speech() -> SonosSpeech {
        SonosSpeech::new(
            Client::new(),
            &SonosConfig {
                base_url: "http://localhost:5005".to_string(),
            },
        )
        .unwrap()
    }

    fn saved() -> Vec<String> {
        ["Morning Jazz", "Dinner", "Late Night Jazz"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn should_encode_room_and_sentence_in_path() {
        let url = speech().say_url("Kitchen", "Front door opened").unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:5005/Kitchen/say/Front%20door%20opened"
        );
    }

    #[test]
    fn should_encode_playlist_name_in_path() {
        let speech = speech();

        assert_eq!(
            speech.playlists_url("Living Room").unwrap().as_str(),
            "http://localhost:5005/Living%20Room/playlists"
        );
        assert_eq!(
            speech.playlist_url("Living Room", "Morning Jazz").unwrap().as_str(),
            "http://localhost:5005/Living%20Room/playlist/Morning%20Jazz"
        );
    }

    #[test]
    fn should_pick_first_playlist_containing_name() {
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(pick_playlist(&saved(), "Jazz", &mut rng), Some("Morning Jazz"));
        assert_eq!(pick_playlist(&saved(), "Dinner", &mut rng), Some("Dinner"));
        assert_eq!(pick_playlist(&saved(), "Polka", &mut rng), None);
    }

    #[test]
    fn should_pick_any_saved_playlist_for_random() {
        let saved = saved();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..10 {
            let picked = pick_playlist(&saved, "Random", &mut rng).unwrap();
            assert!(saved.iter().any(|name| name == picked));
        }
        assert_eq!(pick_playlist(&[], ANY_PLAYLIST, &mut rng), None);
    }
}
