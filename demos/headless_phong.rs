//! Renders a lit sphere and cylinder into an offscreen texture, with a
//! procedurally textured cylinder side and a lone sphere pole cap.
//!
//! Run with `RUST_LOG=debug cargo run --example headless_phong` to follow the
//! layout discovery and uploads.

use anyhow::{anyhow, Context};
use cgmath::{Deg, Matrix4, Point3, Vector3};
use log::info;

use edu_phong::gfx::geometry::{
    fan_to_triangle_list, Cylinder, CylinderResolution, DrawMesh, GpuMesh, Sphere,
    SphereResolution, TransientIndices, VertexLayout,
};
use edu_phong::gfx::lighting::{
    GlobalLighting, Light, LightingConfig, Material, PhongLighting, ProcTexture,
};
use edu_phong::shader::{ShaderKind, ShaderLibrary, ShaderProgram};
use edu_phong::wgpu_utils::{
    binding_types, BindGroupBuilder, BindGroupLayoutBuilder, UniformBuffer,
};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SIZE: u32 = 512;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct TransformsUniform {
    projection: [[f32; 4]; 4],
    modelview: [[f32; 4]; 4],
}

async fn create_device() -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .context("Failed to request adapter")?;
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("WGPU Device"),
            required_features: wgpu::Features::default(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .context("Failed to request a device")
}

struct Programs {
    gouraud: ShaderProgram,
    phong: ShaderProgram,
    textured: ShaderProgram,
}

fn link_programs(library: &ShaderLibrary) -> anyhow::Result<Programs> {
    let gouraud = ShaderProgram::link(
        "Phong Gouraud",
        &[
            library.compose(&[
                "vertexShader_PhongGouraud",
                "phongDeclarations",
                "calcPhongLighting",
            ])?,
            library.compose(&["fragmentShader_PhongGouraud"])?,
        ],
    )?;
    let phong = ShaderProgram::link(
        "Phong Phong",
        &[
            library.compose(&["vertexShader_PhongPhong", "phongDeclarations"])?,
            library.compose(&[
                "fragmentShader_PhongPhong",
                "phongDeclarations",
                "calcPhongLighting",
            ])?,
        ],
    )?;
    let textured = ShaderProgram::link(
        "Phong Textured",
        &[
            library.compose(&["vertexShader_PhongPhong", "phongDeclarations"])?,
            library.compose(&[
                "fragmentShader_PhongTextured",
                "phongDeclarations",
                "calcPhongLighting",
                "procTexture",
            ])?,
        ],
    )?;
    Ok(Programs {
        gouraud,
        phong,
        textured,
    })
}

fn create_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

async fn run() -> anyhow::Result<()> {
    let (device, queue) = create_device().await?;

    let mut library = ShaderLibrary::new();
    library.load_file(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/edu_phong.wgsl"))?;
    let programs = link_programs(&library)?;

    let mut lighting = PhongLighting::new(LightingConfig::default());
    for program in [&programs.gouraud, &programs.phong, &programs.textured] {
        lighting.register_program(&device, program)?;
    }

    let lights = [
        Light::point(Vector3::new(2.0, 3.0, 1.0)).with_attenuation(1.0, 0.05, 0.01),
        Light::directional(Vector3::new(-1.0, 0.5, 1.0)).with_colors(
            Vector3::new(0.05, 0.05, 0.05),
            Vector3::new(0.3, 0.3, 0.4),
            Vector3::new(0.2, 0.2, 0.2),
        ),
        Light::spot(Vector3::new(0.0, 0.0, 2.0), Vector3::new(0.0, 0.0, -1.0), 0.9)
            .with_spot_exponent(8.0),
    ];
    let global = GlobalLighting::default()
        .with_num_lights(lights.len() as u32)
        .with_halfway_vector(true);
    lighting.upload_global_if_valid(&queue, &global)?;
    for (index, light) in lights.iter().enumerate() {
        lighting.upload_light_if_valid(&queue, light, index)?;
    }

    let mut material = Material::new("Brass")
        .with_color(0.78, 0.57, 0.11)
        .with_specular(0.99, 0.94, 0.81, 27.9)
        .with_fresnel(true);
    material.update_gpu_resources(&device, &queue);

    let mut texture = ProcTexture::new().with_scale(12.0, 3.0);
    texture.advance(0.3);
    texture.update_gpu_resources(&device, &queue);

    let layout = VertexLayout::default();
    let mut sphere = GpuMesh::new(Sphere::new(32, 16), layout, "Sphere");
    let mut cylinder = GpuMesh::new(Cylinder::new(24, 4, 2), layout, "Cylinder");
    sphere.prepare(&device)?;
    cylinder.prepare(&device)?;
    // A lower resolution releases the GPU buffers until the next prepare.
    if sphere.remesh(SphereResolution::new(16, 8)) {
        sphere.prepare(&device)?;
    }
    cylinder.remesh(CylinderResolution::new(24, 4, 2));
    let pole_fan = sphere
        .generator()
        .north_pole_fan_indices(layout.has_tex_coords());
    let pole_cap = TransientIndices::upload(
        &device,
        "Sphere North Pole",
        &fan_to_triangle_list(&pole_fan),
    );

    let projection: Matrix4<f32> = cgmath::perspective(Deg(45.0), 1.0, 0.1, 100.0);
    let view: Matrix4<f32> = Matrix4::look_at_rh(
        Point3::new(0.0, 1.5, 5.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
    );
    let transforms = [
        view * Matrix4::from_translation(Vector3::new(-1.2, 0.0, 0.0)),
        view * Matrix4::from_translation(Vector3::new(1.2, -0.5, 0.0)),
        view * Matrix4::from_translation(Vector3::new(0.0, 0.6, 0.0)),
    ]
    .map(|modelview| {
        UniformBuffer::new_with_data(
            &device,
            &TransformsUniform {
                projection: projection.into(),
                modelview: modelview.into(),
            },
        )
    });
    let transforms_layout = BindGroupLayoutBuilder::new()
        .next_binding_vertex(binding_types::uniform())
        .create(&device, "Transforms Bind Group Layout");
    let transform_groups = transforms.each_ref().map(|ubo| {
        BindGroupBuilder::new(&transforms_layout)
            .resource(ubo.binding_resource())
            .create(&device, "Transforms Bind Group")
    });

    let lighting_layout = lighting
        .bind_group_layout()
        .ok_or_else(|| anyhow!("lighting has no registered program"))?;
    let material_layout = material
        .bind_group_layout()
        .ok_or_else(|| anyhow!("material has no GPU resources"))?;
    let texture_layout = texture
        .bind_group_layout()
        .ok_or_else(|| anyhow!("procedural texture has no GPU resources"))?;
    let lit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Phong Pipeline Layout"),
        bind_group_layouts: &[lighting_layout, material_layout, &transforms_layout.layout],
        push_constant_ranges: &[],
    });
    let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Phong Textured Pipeline Layout"),
        bind_group_layouts: &[
            lighting_layout,
            material_layout,
            &transforms_layout.layout,
            texture_layout,
        ],
        push_constant_ranges: &[],
    });

    let attributes = layout.attributes();
    let [gouraud, phong, textured] = [
        (&programs.gouraud, &lit_layout),
        (&programs.phong, &lit_layout),
        (&programs.textured, &textured_layout),
    ]
    .map(|(program, pipeline_layout)| {
        let module = program.create_module(&device);
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(program.label()),
            layout: Some(pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: program.entry_point(ShaderKind::Vertex),
                compilation_options: Default::default(),
                buffers: &[sphere.vertex_buffer_layout(&attributes)],
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: program.entry_point(ShaderKind::Fragment),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    });

    let color_view = create_target(&device, TARGET_FORMAT, "Color Target");
    let depth_view = create_target(&device, DEPTH_FORMAT, "Depth Target");
    let lighting_group = lighting
        .bind_group()
        .ok_or_else(|| anyhow!("lighting has no bind group"))?;
    let material_group = material
        .bind_group()
        .ok_or_else(|| anyhow!("material has no bind group"))?;
    let texture_group = texture
        .bind_group()
        .ok_or_else(|| anyhow!("procedural texture has no bind group"))?;

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Phong Encoder"),
    });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Phong Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_bind_group(0, lighting_group, &[]);
        pass.set_bind_group(1, material_group, &[]);

        pass.set_bind_group(3, texture_group, &[]);

        // Sphere per vertex.
        pass.set_pipeline(&gouraud);
        pass.set_bind_group(2, &transform_groups[0], &[]);
        pass.draw_mesh(&sphere);

        // Cylinder caps per pixel, its side textured.
        let parts = cylinder.generator();
        pass.set_pipeline(&phong);
        pass.set_bind_group(2, &transform_groups[1], &[]);
        pass.draw_mesh_range(&cylinder, parts.top_index_range());
        pass.draw_mesh_range(&cylinder, parts.bottom_index_range());
        pass.set_pipeline(&textured);
        pass.draw_mesh_range(&cylinder, parts.side_index_range());

        // Only the north pole fan of a second sphere.
        pass.set_bind_group(2, &transform_groups[2], &[]);
        pass.draw_mesh_transient(&sphere, &pole_cap);
    }
    queue.submit(Some(encoder.finish()));

    info!(
        "Rendered {} sphere, {} cylinder and {} pole cap triangles (texture time {})",
        sphere.index_count() / 3,
        cylinder.index_count() / 3,
        pole_cap.count() / 3,
        texture.time()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    pollster::block_on(run())
}
