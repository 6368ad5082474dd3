use anyhow::Result;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct RedisClient {
    connection: ConnectionManager,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_tokio_connection_manager().await?;
        Ok(Self { connection })
    }

    pub async fn publish(&mut self, channel: &str, message: &str) -> Result<()> {
        self.connection.publish::<_, _, ()>(channel, message).await?;
        Ok(())
    }

    pub async fn set_with_expiry<T: Serialize>(
        &mut self,
        key: &str,
        value: &T,
        expiry_secs: u64,
    ) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.connection.set_ex::<_, _, ()>(key, json, expiry_secs).await?;
        Ok(())
    }

    pub async fn get<T: for<'de> Deserialize<'de>>(&mut self, key: &str) -> Result<Option<T>> {
        let result: Option<String> = self.connection.get(key).await?;
        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

/// Cache key for a finished answer; questions differing only in case or spacing share it.
pub fn answer_key(question: &str) -> String {
    let normalized = question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    format!("srag:answer:{normalized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_key_normalizes_case_and_spacing() {
        assert_eq!(answer_key("  What is  RUST? "), "srag:answer:what is rust?");
        assert_eq!(answer_key("what is rust?"), answer_key("What   is Rust?"));
    }
}
