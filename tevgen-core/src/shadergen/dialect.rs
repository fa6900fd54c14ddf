// Target shading dialects.
//
// The generator never writes dialect punctuation itself. Everything that
// differs between HLSL (D3D9 / D3D11) and GLSL (OpenGL / Vulkan) goes
// through the `ShaderDialect` trait: declarations, the entry point
// wrapper, interpolants, texture sampling, discard and the bounding box.

use std::fmt::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// API selector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiType {
    /// Shader model 2.0 HLSL.
    D3D9Sm2,
    D3D9,
    D3D11,
    OpenGl,
    Vulkan,
}

impl ApiType {
    pub const ALL: [ApiType; 5] = [
        ApiType::D3D9Sm2,
        ApiType::D3D9,
        ApiType::D3D11,
        ApiType::OpenGl,
        ApiType::Vulkan,
    ];

    pub fn dialect(self) -> &'static dyn ShaderDialect {
        match self {
            ApiType::D3D9Sm2 => &Hlsl9 { shader_model_2: true },
            ApiType::D3D9 => &Hlsl9 { shader_model_2: false },
            ApiType::D3D11 => &Hlsl11,
            ApiType::OpenGl => &Glsl { vulkan: false },
            ApiType::Vulkan => &Glsl { vulkan: true },
        }
    }

    pub fn is_d3d9(self) -> bool {
        matches!(self, ApiType::D3D9 | ApiType::D3D9Sm2)
    }

    pub fn name(self) -> &'static str {
        match self {
            ApiType::D3D9Sm2 => "d3d9-sm2",
            ApiType::D3D9 => "d3d9",
            ApiType::D3D11 => "d3d11",
            ApiType::OpenGl => "opengl",
            ApiType::Vulkan => "vulkan",
        }
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ApiType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "d3d9-sm2" | "d3d9sm2" | "sm2" => Ok(ApiType::D3D9Sm2),
            "d3d9" | "dx9" => Ok(ApiType::D3D9),
            "d3d11" | "dx11" => Ok(ApiType::D3D11),
            "opengl" | "gl" | "glsl" => Ok(ApiType::OpenGl),
            "vulkan" | "vk" => Ok(ApiType::Vulkan),
            other => Err(format!("unknown API '{other}' (expected d3d9-sm2, d3d9, d3d11, opengl or vulkan)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Interface data
// ---------------------------------------------------------------------------

/// One entry of the pixel constant block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformField {
    pub ty: &'static str,
    pub name: &'static str,
    /// Array length; 0 for a plain value.
    pub count: u8,
    /// First D3D9 constant register.
    pub register: u8,
}

impl UniformField {
    pub const fn new(ty: &'static str, name: &'static str, count: u8, register: u8) -> Self {
        Self { ty, name, count, register }
    }

    fn write_decl(&self, out: &mut dyn Write) -> fmt::Result {
        write!(out, "{} {}", self.ty, self.name)?;
        if self.count > 0 {
            write!(out, "[{}]", self.count)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolantName {
    Colors(u8),
    Uv(u8),
    ClipPos,
    Normal,
}

impl fmt::Display for InterpolantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpolantName::Colors(n) => write!(f, "colors_{n}"),
            InterpolantName::Uv(n) => write!(f, "uv{n}"),
            InterpolantName::ClipPos => f.write_str("clipPos"),
            InterpolantName::Normal => f.write_str("Normal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantic {
    Color(u8),
    TexCoord(u8),
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Semantic::Color(n) => write!(f, "COLOR{n}"),
            Semantic::TexCoord(n) => write!(f, "TEXCOORD{n}"),
        }
    }
}

/// A vertex shader output read by the pixel shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpolant {
    pub name: InterpolantName,
    pub components: u8,
    pub semantic: Semantic,
}

/// Interpolation qualifier derived from the anti-aliasing mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum InterpolationQualifier {
    #[default]
    None = 0,
    Centroid = 1,
    Sample = 2,
}

impl InterpolationQualifier {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => InterpolationQualifier::Centroid,
            2 => InterpolationQualifier::Sample,
            _ => InterpolationQualifier::None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            InterpolationQualifier::None => "",
            InterpolationQualifier::Centroid => "centroid ",
            InterpolationQualifier::Sample => "sample ",
        }
    }
}

/// Everything the entry point signature depends on.
#[derive(Debug, Clone, Copy)]
pub struct EntryInterface<'a> {
    pub dual_source: bool,
    pub depth_output: bool,
    pub early_depth: bool,
    pub qualifier: InterpolationQualifier,
    pub interpolants: &'a [Interpolant],
}

// ---------------------------------------------------------------------------
// Dialect trait
// ---------------------------------------------------------------------------

/// Syntax fragments and capabilities of one target dialect.
pub trait ShaderDialect: Send + Sync {
    fn api(&self) -> ApiType;

    fn supports_integer_math(&self) -> bool {
        true
    }

    /// The rasterizer depth is readable as `rawpos.z`.
    fn reads_fragment_depth(&self) -> bool {
        true
    }

    fn supports_early_depth(&self) -> bool {
        true
    }

    fn supports_bounding_box(&self) -> bool {
        false
    }

    fn supports_pixel_lighting(&self) -> bool {
        true
    }

    fn supports_interpolation_qualifiers(&self) -> bool {
        true
    }

    /// The second blend output carries alpha replicated over rgb with zero alpha.
    fn dual_source_replicates_alpha(&self) -> bool {
        false
    }

    /// Version line and compatibility macros.
    fn write_preamble(&self, out: &mut dyn Write, bounding_box: bool) -> fmt::Result;

    fn declare_sampler(&self, out: &mut dyn Write, index: u32) -> fmt::Result;

    /// Separate texture object, for dialects without combined samplers.
    fn declare_texture(&self, _out: &mut dyn Write, _index: u32) -> fmt::Result {
        Ok(())
    }

    fn declare_uniform_block(&self, out: &mut dyn Write, fields: &[UniformField]) -> fmt::Result;

    fn declare_bounding_box(&self, _out: &mut dyn Write) -> fmt::Result {
        Ok(())
    }

    /// Declares one interpolant. `location` is its index in the input list.
    fn interpolant_declaration(
        &self,
        out: &mut dyn Write,
        location: usize,
        interpolant: &Interpolant,
        qualifier: InterpolationQualifier,
    ) -> fmt::Result;

    /// Outputs, inputs and the opening of `main`, leaving every interpolant
    /// readable under its plain name.
    fn begin_entry(&self, out: &mut dyn Write, entry: &EntryInterface<'_>) -> fmt::Result;

    fn end_entry(&self, out: &mut dyn Write) -> fmt::Result {
        out.write_str("}\n")
    }

    /// Sample expression for sampler `sampler` at `coords`.
    fn write_sample(&self, out: &mut dyn Write, sampler: u32, coords: fmt::Arguments<'_>) -> fmt::Result;

    fn discard(&self) -> &'static str {
        "discard;\nreturn;\n"
    }

    fn write_bounding_box_update(&self, _out: &mut dyn Write) -> fmt::Result {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HLSL
// ---------------------------------------------------------------------------

fn write_hlsl_entry(
    dialect: &dyn ShaderDialect,
    out: &mut dyn Write,
    entry: &EntryInterface<'_>,
    targets: (&str, &str, &str, &str),
) -> fmt::Result {
    let (target0, target1, depth, position) = targets;
    if entry.early_depth {
        out.write_str("[earlydepthstencil]\n")?;
    }
    out.write_str("void main(\n")?;
    write!(out, "  out float4 ocol0 : {target0},\n")?;
    if entry.dual_source {
        write!(out, "  out float4 ocol1 : {target1},\n")?;
    }
    if entry.depth_output {
        write!(out, "  out float depth : {depth},\n")?;
    }
    write!(out, "  in float4 rawpos : {position}")?;
    for (location, interpolant) in entry.interpolants.iter().enumerate() {
        out.write_str(",\n")?;
        dialect.interpolant_declaration(out, location, interpolant, entry.qualifier)?;
    }
    out.write_str("\n  ) {\n")
}

/// Direct3D 9 HLSL, shader model 3.0 or 2.0.
#[derive(Debug, Clone, Copy)]
pub struct Hlsl9 {
    pub shader_model_2: bool,
}

impl ShaderDialect for Hlsl9 {
    fn api(&self) -> ApiType {
        if self.shader_model_2 {
            ApiType::D3D9Sm2
        } else {
            ApiType::D3D9
        }
    }

    fn supports_integer_math(&self) -> bool {
        false
    }

    fn reads_fragment_depth(&self) -> bool {
        false
    }

    fn supports_early_depth(&self) -> bool {
        false
    }

    fn supports_pixel_lighting(&self) -> bool {
        !self.shader_model_2
    }

    fn supports_interpolation_qualifiers(&self) -> bool {
        false
    }

    fn dual_source_replicates_alpha(&self) -> bool {
        true
    }

    fn write_preamble(&self, _out: &mut dyn Write, _bounding_box: bool) -> fmt::Result {
        Ok(())
    }

    fn declare_sampler(&self, out: &mut dyn Write, index: u32) -> fmt::Result {
        writeln!(out, "uniform sampler2D samp{index} : register(s{index});")
    }

    fn declare_uniform_block(&self, out: &mut dyn Write, fields: &[UniformField]) -> fmt::Result {
        for field in fields {
            out.write_str("uniform ")?;
            field.write_decl(out)?;
            writeln!(out, " : register(c{});", field.register)?;
        }
        Ok(())
    }

    fn interpolant_declaration(
        &self,
        out: &mut dyn Write,
        _location: usize,
        interpolant: &Interpolant,
        _qualifier: InterpolationQualifier,
    ) -> fmt::Result {
        write!(
            out,
            "  in float{} {} : {}",
            interpolant.components, interpolant.name, interpolant.semantic
        )
    }

    fn begin_entry(&self, out: &mut dyn Write, entry: &EntryInterface<'_>) -> fmt::Result {
        let position = if self.shader_model_2 { "POSITION" } else { "VPOS" };
        write_hlsl_entry(self, out, entry, ("COLOR0", "COLOR1", "DEPTH", position))
    }

    fn write_sample(&self, out: &mut dyn Write, sampler: u32, coords: fmt::Arguments<'_>) -> fmt::Result {
        write!(out, "tex2D(samp{sampler}, {coords})")
    }
}

/// Direct3D 11 HLSL (shader model 5).
#[derive(Debug, Clone, Copy)]
pub struct Hlsl11;

impl ShaderDialect for Hlsl11 {
    fn api(&self) -> ApiType {
        ApiType::D3D11
    }

    fn supports_bounding_box(&self) -> bool {
        true
    }

    fn write_preamble(&self, _out: &mut dyn Write, _bounding_box: bool) -> fmt::Result {
        Ok(())
    }

    fn declare_sampler(&self, out: &mut dyn Write, index: u32) -> fmt::Result {
        writeln!(out, "sampler samp{index} : register(s{index});")
    }

    fn declare_texture(&self, out: &mut dyn Write, index: u32) -> fmt::Result {
        writeln!(out, "Texture2D Tex{index} : register(t{index});")
    }

    fn declare_uniform_block(&self, out: &mut dyn Write, fields: &[UniformField]) -> fmt::Result {
        out.write_str("cbuffer PSBlock : register(b0) {\n")?;
        for field in fields {
            out.write_str("\t")?;
            field.write_decl(out)?;
            out.write_str(";\n")?;
        }
        out.write_str("};\n")
    }

    fn declare_bounding_box(&self, out: &mut dyn Write) -> fmt::Result {
        out.write_str("globallycoherent RWBuffer<int> bbox_data : register(u2);\n")
    }

    fn interpolant_declaration(
        &self,
        out: &mut dyn Write,
        _location: usize,
        interpolant: &Interpolant,
        qualifier: InterpolationQualifier,
    ) -> fmt::Result {
        write!(
            out,
            "  in {}float{} {} : {}",
            qualifier.keyword(),
            interpolant.components,
            interpolant.name,
            interpolant.semantic
        )
    }

    fn begin_entry(&self, out: &mut dyn Write, entry: &EntryInterface<'_>) -> fmt::Result {
        write_hlsl_entry(self, out, entry, ("SV_Target0", "SV_Target1", "SV_Depth", "SV_Position"))
    }

    fn write_sample(&self, out: &mut dyn Write, sampler: u32, coords: fmt::Arguments<'_>) -> fmt::Result {
        write!(out, "Tex{sampler}.Sample(samp{sampler}, {coords})")
    }

    fn discard(&self) -> &'static str {
        "discard;\n"
    }

    fn write_bounding_box_update(&self, out: &mut dyn Write) -> fmt::Result {
        out.write_str(concat!(
            "InterlockedMin(bbox_data[0], int(rawpos.x));\n",
            "InterlockedMax(bbox_data[1], int(rawpos.x));\n",
            "InterlockedMin(bbox_data[2], int(rawpos.y));\n",
            "InterlockedMax(bbox_data[3], int(rawpos.y));\n",
        ))
    }
}

// ---------------------------------------------------------------------------
// GLSL
// ---------------------------------------------------------------------------

const GLSL_MACROS: &str = concat!(
    "#define float2 vec2\n",
    "#define float3 vec3\n",
    "#define float4 vec4\n",
    "#define int2 ivec2\n",
    "#define int3 ivec3\n",
    "#define int4 ivec4\n",
    "#define frac fract\n",
    "#define lerp mix\n",
    "#define saturate(x) clamp(x, 0.0, 1.0)\n",
    "#define ddx dFdx\n",
    "#define ddy dFdy\n",
    "#define rsqrt inversesqrt\n",
);

/// Desktop GLSL, or Vulkan-flavoured GLSL with explicit set/binding layouts.
#[derive(Debug, Clone, Copy)]
pub struct Glsl {
    pub vulkan: bool,
}

impl ShaderDialect for Glsl {
    fn api(&self) -> ApiType {
        if self.vulkan {
            ApiType::Vulkan
        } else {
            ApiType::OpenGl
        }
    }

    fn supports_bounding_box(&self) -> bool {
        true
    }

    fn write_preamble(&self, out: &mut dyn Write, bounding_box: bool) -> fmt::Result {
        let version = match (self.vulkan, bounding_box) {
            (true, _) => "450",
            (false, true) => "430",
            (false, false) => "330",
        };
        writeln!(out, "#version {version} core")?;
        out.write_str(GLSL_MACROS)?;
        out.write_str("\n")
    }

    fn declare_sampler(&self, out: &mut dyn Write, index: u32) -> fmt::Result {
        if self.vulkan {
            writeln!(out, "layout(set = 1, binding = {index}) uniform sampler2D samp{index};")
        } else {
            writeln!(out, "uniform sampler2D samp{index};")
        }
    }

    fn declare_uniform_block(&self, out: &mut dyn Write, fields: &[UniformField]) -> fmt::Result {
        if self.vulkan {
            out.write_str("layout(std140, set = 0, binding = 0) uniform PSBlock {\n")?;
        } else {
            out.write_str("layout(std140) uniform PSBlock {\n")?;
        }
        for field in fields {
            out.write_str("\t")?;
            field.write_decl(out)?;
            out.write_str(";\n")?;
        }
        out.write_str("};\n")
    }

    fn declare_bounding_box(&self, out: &mut dyn Write) -> fmt::Result {
        if self.vulkan {
            out.write_str("layout(std430, set = 2, binding = 0) coherent buffer BBox {\n")?;
        } else {
            out.write_str("layout(std430, binding = 3) coherent buffer BBox {\n")?;
        }
        out.write_str("\tint bbox_data[4];\n};\n")
    }

    fn interpolant_declaration(
        &self,
        out: &mut dyn Write,
        location: usize,
        interpolant: &Interpolant,
        qualifier: InterpolationQualifier,
    ) -> fmt::Result {
        if self.vulkan {
            write!(out, "layout(location = {location}) ")?;
        }
        writeln!(
            out,
            "{}in float{} {}_2;",
            qualifier.keyword(),
            interpolant.components,
            interpolant.name
        )
    }

    fn begin_entry(&self, out: &mut dyn Write, entry: &EntryInterface<'_>) -> fmt::Result {
        if entry.dual_source {
            out.write_str("layout(location = 0, index = 0) out float4 ocol0;\n")?;
            out.write_str("layout(location = 0, index = 1) out float4 ocol1;\n")?;
        } else {
            out.write_str("layout(location = 0) out float4 ocol0;\n")?;
        }
        if entry.depth_output {
            out.write_str("#define depth gl_FragDepth\n")?;
        }
        for (location, interpolant) in entry.interpolants.iter().enumerate() {
            self.interpolant_declaration(out, location, interpolant, entry.qualifier)?;
        }
        if entry.early_depth {
            out.write_str("layout(early_fragment_tests) in;\n")?;
        }
        out.write_str("void main()\n{\n")?;
        out.write_str("float4 rawpos = gl_FragCoord;\n")?;
        // Inputs are read-only in GLSL; work on local copies.
        for interpolant in entry.interpolants {
            writeln!(
                out,
                "float{} {} = {}_2;",
                interpolant.components, interpolant.name, interpolant.name
            )?;
        }
        Ok(())
    }

    fn write_sample(&self, out: &mut dyn Write, sampler: u32, coords: fmt::Arguments<'_>) -> fmt::Result {
        write!(out, "texture(samp{sampler}, {coords})")
    }

    fn write_bounding_box_update(&self, out: &mut dyn Write) -> fmt::Result {
        out.write_str(concat!(
            "atomicMin(bbox_data[0], int(rawpos.x));\n",
            "atomicMax(bbox_data[1], int(rawpos.x));\n",
            "atomicMin(bbox_data[2], int(rawpos.y));\n",
            "atomicMax(bbox_data[3], int(rawpos.y));\n",
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
