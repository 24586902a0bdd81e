use crate::pathing::algorithm::AlgorithmKind;
use crate::world::position::Point3D;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    RebuildGraph,
    ExportGraph { file: Option<String> },
    LoadGraph { file: Option<String> },
    Path {
        from: Point3D,
        to: Point3D,
        algorithm: Option<AlgorithmKind>,
    },
    Follow {
        from: Point3D,
        to: Point3D,
        ticks: u32,
    },
    Island { a: Point3D, b: Point3D },
    GraphInfo,
    Unknown(String),
}

/// Tick budget of `!follow` when none is given.
pub const DEFAULT_FOLLOW_TICKS: u32 = 1000;

pub fn parse_admin_command(message: &str) -> Result<Option<AdminCommand>, String> {
    let trimmed = message.trim();
    let Some(body) = trimmed.strip_prefix('!') else {
        return Ok(None);
    };

    let mut parts = body.split_whitespace();
    let command = parts
        .next()
        .ok_or_else(|| "admin command missing name".to_string())?;
    let command = command.to_ascii_lowercase();
    let parsed = match command.as_str() {
        "rebuildgraph" | "rebuild" => AdminCommand::RebuildGraph,
        "exportgraph" | "export" => AdminCommand::ExportGraph {
            file: parts.next().map(str::to_string),
        },
        "loadgraph" | "load" => AdminCommand::LoadGraph {
            file: parts.next().map(str::to_string),
        },
        "path" => {
            let from = parse_point(&mut parts)?;
            let to = parse_point(&mut parts)?;
            let algorithm = match parts.next() {
                None => None,
                Some(name) => Some(
                    AlgorithmKind::parse(name)
                        .ok_or_else(|| format!("admin command unknown algorithm '{name}'"))?,
                ),
            };
            AdminCommand::Path {
                from,
                to,
                algorithm,
            }
        }
        "follow" => {
            let from = parse_point(&mut parts)?;
            let to = parse_point(&mut parts)?;
            let ticks = match parts.next() {
                None => DEFAULT_FOLLOW_TICKS,
                Some(raw) => raw
                    .parse::<u32>()
                    .map_err(|_| format!("admin command expected tick count, got '{raw}'"))?,
            };
            AdminCommand::Follow { from, to, ticks }
        }
        "island" => {
            let a = parse_point(&mut parts)?;
            let b = parse_point(&mut parts)?;
            AdminCommand::Island { a, b }
        }
        "graphinfo" | "info" => AdminCommand::GraphInfo,
        _ => AdminCommand::Unknown(command),
    };
    Ok(Some(parsed))
}

fn parse_point<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<Point3D, String> {
    let x = parse_i32(parts.next())?;
    let y = parse_i32(parts.next())?;
    let z = parse_i32(parts.next())?;
    Ok(Point3D::new(x, y, z))
}

fn parse_i32(value: Option<&str>) -> Result<i32, String> {
    let value = value.ok_or_else(|| "admin command missing position value".to_string())?;
    value
        .parse::<i32>()
        .map_err(|_| format!("admin command expected integer, got '{value}'"))
}
