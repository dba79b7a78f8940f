//! Model export: textual dump, typed configuration and STL meshes

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{
    FrameConfig, InertiaConfig, JointConfig, ModelConfig, ShapeConfig, TypeSpec,
};
use crate::constants::TRANSFORM_EPSILON;
use crate::error::KinError;
use crate::inertia::DynType;
use crate::mesh::save_stl;
use crate::shape::{Shape, ShapeType};
use crate::world::{Frame, Joint, Mimic, World};

/// Attributes written into dedicated config fields instead of the attribute map
const SHAPE_ATTRIBUTES: [&str; 2] = ["mesh", "meshscale"];

/// Write one line per frame describing its shape, joint and pose
///
/// Children show their relative transform `Q`, roots their global pose `X`;
/// identity transforms are omitted.
pub fn write_world(world: &World, out: &mut impl fmt::Write) -> fmt::Result {
    for frame in world.frames() {
        write!(out, "frame {}", frame.name)?;
        if let Some(parent) = frame.parent() {
            write!(out, " ({})", world.frame_name(parent).unwrap_or("?"))?;
        }
        write!(out, " {{")?;
        if let Some(shape) = frame.shape() {
            write_shape(shape, frame, out)?;
        }
        if frame.parent().is_some() {
            if let Some(joint) = frame.joint() {
                write_joint(world, joint, out)?;
            }
            if !frame.rel.is_identity(TRANSFORM_EPSILON) {
                write!(out, " Q=<T {}>", frame.rel)?;
            }
        } else if !frame.pose.is_identity(TRANSFORM_EPSILON) {
            write!(out, " X=<T {}>", frame.pose)?;
        }
        writeln!(out, " }}")?;
    }
    Ok(())
}

fn write_shape(shape: &Shape, frame: &Frame, out: &mut impl fmt::Write) -> fmt::Result {
    write!(out, " shape={} size=[{}]", shape.shape_type, list(&shape.size))?;
    if let Some(color) = shape.mesh.colors.first() {
        write!(out, " color=[{}]", list(color))?;
    }
    for key in SHAPE_ATTRIBUTES {
        if let Some(value) = frame.attributes.get(key) {
            write!(out, " {key}={value}")?;
        }
    }
    if shape.contact {
        write!(out, " contact")?;
    }
    Ok(())
}

fn write_joint(world: &World, joint: &Joint, out: &mut impl fmt::Write) -> fmt::Result {
    write!(out, " joint={}", joint.joint_type())?;
    if joint.ctrl_h != 0.0 {
        write!(out, " ctrl_H={}", joint.ctrl_h)?;
    }
    if !joint.limits.is_empty() {
        write!(out, " limits=[{}]", list(&joint.limits))?;
    }
    if let Some(mimic) = joint.mimic() {
        write!(out, " mimic={}", mimic_name(world, mimic))?;
    }
    if !joint.q0.is_empty() {
        write!(out, " q=[{}]", list(&joint.q0))?;
    }
    Ok(())
}

fn list(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn mimic_name(world: &World, mimic: &Mimic) -> String {
    match mimic {
        Mimic::Resolved(id) => world.frame_name(*id).unwrap_or("?").to_string(),
        Mimic::Pending(name) => name.clone(),
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_world(self, f)
    }
}

/// Export the world as a typed configuration that imports back to the same tree
///
/// Spliced prefix frames are exported as ordinary frames; joint coordinates
/// are carried by `Q`.
pub fn export_config(world: &World) -> ModelConfig {
    let frames = world
        .frames()
        .iter()
        .map(|frame| {
            let is_root = frame.parent().is_none();
            let mut attributes = frame.attributes.clone();
            attributes.retain(|k, _| !SHAPE_ATTRIBUTES.contains(&k.as_str()));

            FrameConfig {
                name: frame.name.clone(),
                parent: frame
                    .parent()
                    .and_then(|p| world.frame_name(p))
                    .map(str::to_string),
                pose: (is_root && !frame.pose.is_identity(TRANSFORM_EPSILON))
                    .then(|| frame.pose.to_array().to_vec()),
                rel: (!is_root && !frame.rel.is_identity(TRANSFORM_EPSILON))
                    .then(|| frame.rel.to_array().to_vec()),
                mass: frame.inertia().map(|i| i.mass),
                active: frame.active,
                joint: frame.joint().map(|j| joint_config(world, j)),
                shape: frame.shape().map(|s| shape_config(s, frame)),
                inertia: frame
                    .inertia()
                    .filter(|i| i.dyn_type != DynType::Dynamic)
                    .map(|i| InertiaConfig {
                        dyntype: Some(i.dyn_type.into()),
                        ..InertiaConfig::default()
                    }),
                attributes,
            }
        })
        .collect();
    ModelConfig { frames }
}

fn joint_config(world: &World, joint: &Joint) -> JointConfig {
    let dim = joint.dim();
    let (limits, ctrl_limits) = if joint.limits.len() == 2 * dim + 3 {
        let (pos, ctrl) = joint.limits.split_at(2 * dim);
        (Some(pos.to_vec()), Some(ctrl.to_vec()))
    } else {
        ((!joint.limits.is_empty()).then(|| joint.limits.clone()), None)
    };
    JointConfig {
        joint_type: Some(TypeSpec::Name(joint.joint_type().name().to_string())),
        ctrl_h: Some(joint.ctrl_h),
        limits,
        ctrl_limits,
        mimic: joint.mimic().map(|m| mimic_name(world, m)),
        inactive: !joint.is_active(),
        uncertainty: joint.uncertainty.as_ref().map(|u| u.sigma.clone()),
        ..JointConfig::default()
    }
}

fn shape_config(shape: &Shape, frame: &Frame) -> ShapeConfig {
    let colored_box = shape.shape_type == ShapeType::Box && shape.mesh.colors.len() > 1;
    let base_color = if colored_box {
        shape.mesh.colors.get(2)
    } else {
        shape.mesh.colors.first()
    };
    let color = base_color.map(|c| {
        let mut rgba = c.to_vec();
        if shape.alpha != 1.0 {
            rgba.push(shape.alpha);
        }
        rgba
    });
    ShapeConfig {
        shape_type: Some(TypeSpec::Name(shape.shape_type.name().to_string())),
        size: Some(shape.size.to_vec()),
        color,
        mesh: frame.attributes.get("mesh").map(PathBuf::from),
        meshscale: frame
            .attributes
            .get("meshscale")
            .and_then(|s| s.parse().ok()),
        contact: shape.contact,
        colored_box,
        center_mesh: false,
    }
}

/// Write every shape mesh as `<frame>.stl` into `output_dir`
pub fn export_meshes(world: &World, output_dir: &Path) -> Result<Vec<PathBuf>, KinError> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| KinError::Config(format!("{}: {}", output_dir.display(), e)))?;

    let mut written = Vec::new();
    for frame in world.frames() {
        let Some(shape) = frame.shape() else {
            continue;
        };
        if shape.mesh.triangles.is_empty() {
            continue;
        }
        let path = output_dir.join(sanitize_filename(&frame.name) + ".stl");
        save_stl(&shape.mesh, &path)?;
        written.push(path);
    }
    info!(
        "Exported {} meshes to {}",
        written.len(),
        output_dir.display()
    );
    Ok(written)
}

/// Sanitize a frame name for use as a filename
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportOptions, build_world, import_model_str};
    use crate::world::JointType;

    const MODEL: &str = r#"(frames: [
        (name: "table", X: [0.0, 0.0, 0.5], shape: (type: "box", size: [2.0, 1.0, 0.1], coloredBox: true, color: [1.0, 0.0, 0.0])),
        (name: "slider", parent: "table", joint: (type: "transX", q: 0.25, limits: [-1.0, 1.0], ctrl_limits: [1.0, 2.0, 3.0])),
        (name: "gripper", parent: "slider", joint: (type: "hingeZ", A: [0.0, 0.0, 0.1], q: 0.3)),
        (name: "twin", parent: "slider", joint: (type: "hingeZ", mimic: "gripper")),
        (name: "crate", mass: 2.0, inertia: (kinematic: true), shape: (type: "sphere", size: [0.0, 0.0, 0.0, 0.2], contact: true)),
    ])"#;

    #[test]
    fn test_dump_lines() {
        let world = import_model_str(MODEL).unwrap();
        let dump = world.to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), world.frame_count());

        assert!(lines[0].starts_with("frame table {"));
        assert!(lines[0].contains("shape=box size=[2 1 0.1 0.1]"));
        assert!(lines[0].contains("X=<T 0 0 0.5 1 0 0 0>"));
        assert!(lines[1].contains("(table)"));
        assert!(lines[1].contains("joint=transX ctrl_H=1 limits=[-1 1 1 2 3] q=[0.25]"));
        assert!(lines[1].contains("Q=<T 0.25 0 0 1 0 0 0>"));
        assert!(lines[3].contains("mimic=gripper"));
        assert!(lines[4].contains("contact"));
        assert!(lines[5].starts_with("frame >gripper (slider)"));
    }

    #[test]
    fn test_config_round_trip() {
        let world = import_model_str(MODEL).unwrap();
        let config = export_config(&world);
        let copy = build_world(&config, &ImportOptions::default()).unwrap();

        assert_eq!(copy.frame_count(), world.frame_count());
        for (a, b) in world.frames().iter().zip(copy.frames()) {
            assert_eq!(a.name, b.name);
            assert!(a.pose.approx_eq(&b.pose, 1e-9), "{}", a.name);
            assert_eq!(
                a.joint().map(|j| j.joint_type()),
                b.joint().map(|j| j.joint_type())
            );
            assert_eq!(a.shape().map(|s| &s.mesh.colors), b.shape().map(|s| &s.mesh.colors));
        }

        let slider = copy.frame_by_name("slider").unwrap().joint().unwrap();
        assert_eq!(slider.limits, vec![-1.0, 1.0, 1.0, 2.0, 3.0]);
        let crate_frame = copy.frame_by_name("crate").unwrap();
        assert_eq!(crate_frame.inertia().unwrap().dyn_type, DynType::Kinematic);
        assert_eq!(
            copy.frame_by_name("twin").unwrap().joint().unwrap().joint_type(),
            JointType::HingeZ
        );
    }

    #[test]
    fn test_export_meshes() {
        let world = import_model_str(MODEL).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let written = export_meshes(&world, dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("table.stl").exists());
        assert!(dir.path().join("crate.stl").exists());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename(">arm link"), "_arm_link");
    }
}
