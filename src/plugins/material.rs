//! 内建材料属性库
//!
//! 进程内能力 material_database：按材料名查密度、强度等属性，不经过脚本生成。

use std::collections::HashMap;
use std::sync::Arc;

use crate::plugins::{InProcessCapability, InvocationKind, PluginDescriptor};

/// 单个材料的力学属性
#[derive(Debug, Clone, Copy)]
struct MaterialProperties {
    /// g/cm³
    density: f64,
    /// MPa
    tensile_strength: f64,
    /// MPa
    yield_strength: f64,
    /// GPa
    youngs_modulus: f64,
    poissons_ratio: f64,
}

/// 材料属性库：内置常用工程材料
pub struct MaterialDatabase {
    materials: HashMap<&'static str, MaterialProperties>,
}

impl MaterialDatabase {
    pub fn new() -> Self {
        let mut materials = HashMap::new();
        materials.insert(
            "aluminum",
            MaterialProperties {
                density: 2.7,
                tensile_strength: 90.0,
                yield_strength: 55.0,
                youngs_modulus: 70.0,
                poissons_ratio: 0.33,
            },
        );
        materials.insert(
            "steel",
            MaterialProperties {
                density: 7.85,
                tensile_strength: 400.0,
                yield_strength: 250.0,
                youngs_modulus: 200.0,
                poissons_ratio: 0.27,
            },
        );
        materials.insert(
            "titanium",
            MaterialProperties {
                density: 4.51,
                tensile_strength: 950.0,
                yield_strength: 880.0,
                youngs_modulus: 114.0,
                poissons_ratio: 0.34,
            },
        );
        materials.insert(
            "plastic",
            MaterialProperties {
                density: 1.2,
                tensile_strength: 50.0,
                yield_strength: 30.0,
                youngs_modulus: 2.5,
                poissons_ratio: 0.35,
            },
        );
        Self { materials }
    }

    /// 注册表用的描述符：必需参数 material
    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor {
            name: "material_database".to_string(),
            description: "Material properties lookup (density, strength, modulus)".to_string(),
            required: vec!["material".to_string()],
            kind: InvocationKind::InProcess(Arc::new(Self::new())),
        }
    }
}

impl Default for MaterialDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl InProcessCapability for MaterialDatabase {
    fn call(&self, params: &HashMap<String, String>) -> Result<String, String> {
        let name = params
            .get("material")
            .map(|m| m.trim().to_lowercase())
            .unwrap_or_default();

        match self.materials.get(name.as_str()) {
            Some(p) => Ok(format!(
                "Material: {}\n  Density: {} g/cm³\n  Tensile Strength: {} MPa\n  Yield Strength: {} MPa\n  Young's Modulus: {} GPa\n  Poisson's Ratio: {}",
                name, p.density, p.tensile_strength, p.yield_strength, p.youngs_modulus, p.poissons_ratio
            )),
            None => {
                let mut available: Vec<&str> = self.materials.keys().copied().collect();
                available.sort();
                Err(format!(
                    "Material '{}' not found. Available materials: {}",
                    name,
                    available.join(", ")
                ))
            }
        }
    }
}
