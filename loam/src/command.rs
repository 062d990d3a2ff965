use loam_util::math::vector2::Vector2;
use loam_world::{
    ChunkManager,
    chunk::{ChunkReadingError, ChunkWritingError},
    coordinates::ChunkPos,
};
use thiserror::Error;

pub const USAGE: &str =
    "usage: loam <info | create <cx> <cz> | copy <sx> <sz> <dx> <dz> | delete <cx> <cz> | relight>";

#[derive(Error, Debug)]
pub enum CliError {
    #[error("No command given, {}", USAGE)]
    MissingCommand,
    #[error("Unknown command {0:?}, {usage}", usage = USAGE)]
    UnknownCommand(String),
    #[error("{command} takes {expected} arguments but {found} were given")]
    WrongArgumentCount {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{0:?} is not a chunk coordinate")]
    InvalidCoordinate(String),
    #[error("There is no chunk at {0} to copy")]
    NothingToCopy(ChunkPos),
    #[error("There is no chunk at {0} to delete")]
    NothingToDelete(ChunkPos),
    #[error("Failed to read the world: {0}")]
    Reading(#[from] ChunkReadingError),
    #[error("Failed to write the world: {0}")]
    Writing(#[from] ChunkWritingError),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Info,
    Create(ChunkPos),
    Copy { from: ChunkPos, to: ChunkPos },
    Delete(ChunkPos),
    Relight,
}

fn coordinates<const N: usize>(
    command: &'static str,
    args: &[String],
) -> Result<[i32; N], CliError> {
    if args.len() != N {
        return Err(CliError::WrongArgumentCount {
            command,
            expected: N,
            found: args.len(),
        });
    }

    let mut parsed = [0; N];
    for (slot, arg) in parsed.iter_mut().zip(args) {
        *slot = arg
            .parse()
            .map_err(|_| CliError::InvalidCoordinate(arg.clone()))?;
    }
    Ok(parsed)
}

impl Command {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, CliError> {
        let mut args = args.into_iter();
        let name = args.next().ok_or(CliError::MissingCommand)?;
        let rest: Vec<String> = args.collect();

        match name.as_str() {
            "info" => coordinates::<0>("info", &rest).map(|_| Self::Info),
            "create" => {
                let [x, z] = coordinates::<2>("create", &rest)?;
                Ok(Self::Create(Vector2::new(x, z)))
            }
            "copy" => {
                let [sx, sz, dx, dz] = coordinates::<4>("copy", &rest)?;
                Ok(Self::Copy {
                    from: Vector2::new(sx, sz),
                    to: Vector2::new(dx, dz),
                })
            }
            "delete" => {
                let [x, z] = coordinates::<2>("delete", &rest)?;
                Ok(Self::Delete(Vector2::new(x, z)))
            }
            "relight" => coordinates::<0>("relight", &rest).map(|_| Self::Relight),
            _ => Err(CliError::UnknownCommand(name)),
        }
    }

    pub fn run(&self, manager: &ChunkManager) -> Result<(), CliError> {
        match self {
            Self::Info => {
                let regions = manager.region_manager().regions().len();
                let chunks = manager.iter().count();
                log::info!("{} regions holding {} chunks", regions, chunks);
            }
            Self::Create(pos) => {
                manager.create_chunk(*pos)?;
                manager.save()?;
                log::info!("Created chunk {}", pos);
            }
            Self::Copy { from, to } => {
                manager
                    .copy_chunk(*from, *to)?
                    .ok_or(CliError::NothingToCopy(*from))?;
                manager.save()?;
                log::info!("Copied chunk {} to {}", from, to);
            }
            Self::Delete(pos) => {
                if !manager.delete_chunk(*pos)? {
                    return Err(CliError::NothingToDelete(*pos));
                }
                manager.save()?;
                log::info!("Deleted chunk {}", pos);
            }
            Self::Relight => {
                for chunk in manager {
                    chunk.mark_dirty(true);
                }
                let summary = manager.relight_dirty_chunks();
                let saved = manager.save()?;
                log::info!("Relit {} chunks, saved {}", summary.relit, saved);
            }
        }
        Ok(())
    }
}
