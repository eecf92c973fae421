//! In-memory registries and loopback Redis stand-ins for unit tests.

use crate::config::RegistryConfig;
use crate::header::Token;
use crate::registry::{Membership, RegistryError, TokenRegistry};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Answers from a fixed set of tokens.
#[derive(Clone, Default)]
pub struct StaticRegistry {
    tokens: Arc<HashSet<String>>,
}

impl StaticRegistry {
    pub fn with_tokens(tokens: &[&str]) -> Self {
        Self {
            tokens: Arc::new(tokens.iter().map(|t| t.to_string()).collect()),
        }
    }
}

impl TokenRegistry for StaticRegistry {
    async fn is_member(&self, token: &Token) -> Result<Membership, RegistryError> {
        Ok(Membership::from(self.tokens.contains(token.as_str())))
    }
}

/// Fails a fixed number of times, then returns a fixed answer.
#[derive(Clone)]
pub struct ScriptedRegistry {
    failures: u32,
    answer: Membership,
    calls: Arc<AtomicU32>,
}

impl ScriptedRegistry {
    pub fn failing_then(failures: u32, answer: Membership) -> Self {
        Self {
            failures,
            answer,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A registry that never answers.
    pub fn unreachable() -> Self {
        Self::failing_then(u32::MAX, Membership::Member)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenRegistry for ScriptedRegistry {
    async fn is_member(&self, _token: &Token) -> Result<Membership, RegistryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(RegistryError::ConnectTimeout {
                addr: "registry.test:6379".into(),
                timeout: Duration::from_millis(1),
            });
        }
        Ok(self.answer)
    }
}

/// A loopback server speaking just enough RESP to answer `SISMEMBER`
/// against one fixed set. Any other command gets `+OK`.
pub struct FakeRedis {
    port: u16,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
    task: JoinHandle<()>,
}

impl FakeRedis {
    pub async fn start(set_key: &str, members: &[&str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let set_key = set_key.to_string();
        let members: Arc<HashSet<String>> =
            Arc::new(members.iter().map(|m| m.to_string()).collect());

        let recorded = commands.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let set_key = set_key.clone();
                let members = members.clone();
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);
                    while let Ok(Some(command)) = read_command(&mut reader).await {
                        let reply: &[u8] = match command.as_slice() {
                            [name, key, member] if name.eq_ignore_ascii_case("SISMEMBER") => {
                                if *key == set_key && members.contains(member) {
                                    b":1\r\n"
                                } else {
                                    b":0\r\n"
                                }
                            }
                            _ => b"+OK\r\n",
                        };
                        recorded.lock().unwrap().push(command);
                        if write.write_all(reply).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Self {
            port,
            commands,
            task,
        }
    }

    pub fn config(&self, set_key: &str) -> Arc<RegistryConfig> {
        Arc::new(RegistryConfig::resolve("127.0.0.1", &self.port.to_string(), set_key).unwrap())
    }

    /// Every `SISMEMBER` received, in arrival order.
    pub fn membership_queries(&self) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.first().is_some_and(|n| n.eq_ignore_ascii_case("SISMEMBER")))
            .cloned()
            .collect()
    }
}

impl Drop for FakeRedis {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_command<R>(reader: &mut R) -> std::io::Result<Option<Vec<String>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let count = header_len(&line, '*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len = header_len(&line, '$')?;
        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(Some(args))
}

fn header_len(line: &str, prefix: char) -> std::io::Result<usize> {
    line.trim_end()
        .strip_prefix(prefix)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, line.to_string()))
}

/// A listener that accepts connections and never answers.
pub struct SilentRedis {
    port: u16,
    task: JoinHandle<()>,
}

impl SilentRedis {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        Self { port, task }
    }

    pub fn config(&self) -> Arc<RegistryConfig> {
        Arc::new(RegistryConfig::resolve("127.0.0.1", &self.port.to_string(), "").unwrap())
    }
}

impl Drop for SilentRedis {
    fn drop(&mut self) {
        self.task.abort();
    }
}
