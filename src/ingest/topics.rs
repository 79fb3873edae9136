// src/ingest/topics.rs
use anyhow::{bail, Result};
use rand::Rng;

/// Search keywords rotated through by the ingest loop when no topics file is configured.
pub const DEFAULT_TOPICS: &[&str] = &[
    "football", "basketball", "technology", "music", "science", "news", "gaming", "movies",
    "fitness", "health", "politics", "art", "history", "cooking", "travel", "sports", "animals",
    "space", "environment", "nature", "culture", "education", "photography", "finance", "investing",
    "business", "startup", "entrepreneurship", "real estate", "crypto", "stocks", "marketing", "SEO",
    "web development", "app development", "coding", "AI", "machine learning", "data science", "robotics",
    "VR", "AR", "gadgets", "smartphones", "laptops", "tablets", "cars", "electric vehicles", "space exploration",
    "NASA", "astronomy", "biography", "documentaries", "comedy", "stand-up comedy", "animation", "films",
    "reviews", "reaction videos", "vlogs", "food", "recipes", "gaming tutorials", "Minecraft", "Fortnite",
    "Call of Duty", "League of Legends", "Valorant", "Counter-Strike", "PUBG", "TikTok", "Instagram",
    "YouTube growth", "podcasts", "interviews", "travel vlogs", "airplanes", "trains", "boats", "bicycles",
    "furniture", "interior design", "home improvement", "DIY", "crafts", "gardening", "sustainability",
    "renewable energy", "3D printing", "biotechnology", "genetics", "chemistry", "physics", "psychology",
    "sociology", "philosophy", "literature", "poetry", "classic literature", "novels", "mystery books",
    "self-help", "motivation", "inspiration", "mental health", "relationships", "parenting", "family",
    "life hacks", "time management", "productivity", "mindfulness", "meditation", "yoga", "sports highlights",
    "Olympics", "World Cup", "Super Bowl", "Champions League", "NBA Finals", "NFL", "NHL", "UFC", "boxing",
];

/// Fixed, read-only topic list. Picks are uniform and independent, so repeats are expected.
#[derive(Debug, Clone)]
pub struct TopicScheduler {
    topics: Vec<String>,
}

impl Default for TopicScheduler {
    fn default() -> Self {
        Self {
            topics: DEFAULT_TOPICS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TopicScheduler {
    pub fn new(topics: Vec<String>) -> Result<Self> {
        if topics.is_empty() {
            bail!("topic list must not be empty");
        }
        Ok(Self { topics })
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn next_topic(&self) -> &str {
        self.next_topic_with(&mut rand::rng())
    }

    pub fn next_topic_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let idx = rng.random_range(0..self.topics.len());
        &self.topics[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn default_list_is_the_full_rotation() {
        let s = TopicScheduler::default();
        assert_eq!(s.topics().len(), DEFAULT_TOPICS.len());
        assert!(s.topics().iter().any(|t| t == "football"));
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(TopicScheduler::new(Vec::new()).is_err());
    }

    #[test]
    fn picks_come_from_the_list_and_cover_it() {
        let s = TopicScheduler::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let t = s.next_topic_with(&mut rng);
            assert!(s.topics().iter().any(|x| x == t));
            seen.insert(t.to_string());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn single_topic_always_wins() {
        let s = TopicScheduler::new(vec!["only".into()]).unwrap();
        assert_eq!(s.next_topic(), "only");
        assert_eq!(s.next_topic(), "only");
    }
}
