use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use archimedes_core::math::Mat3;
use archimedes_graphics::shader::ProgramReflection;
use archimedes_graphics::vertex::{AttributeInfo, RecordBacking};
use archimedes_graphics::{
    AttributeSchema, AttributeType, ClearColor, Device, Geometry, GeometryDescriptor,
    GeometryLayout, RecordSchema, RecordingDevice, RenderPass, Shader, Variable,
    VertexArraySchema, compile_renderer,
};

fn sprite_attributes() -> AttributeSchema {
    AttributeSchema::new([
        AttributeInfo::new("corner", AttributeType::FloatVec2, 0),
        AttributeInfo::new("transform", AttributeType::FloatMat3, 1),
        AttributeInfo::new("color", AttributeType::FloatVec4, 4),
    ])
    .unwrap()
}

// ---------------------------------------------------------------------------
// Record arena
// ---------------------------------------------------------------------------

fn bench_backing_churn(c: &mut Criterion) {
    let schema = Arc::new(RecordSchema::new(&sprite_attributes()).unwrap());
    c.bench_function("record_backing_acquire_release_1000", |b| {
        b.iter_with_setup(
            || RecordBacking::new(schema.clone(), 0),
            |mut backing| {
                let records: Vec<_> = (0..1000).map(|_| backing.acquire()).collect();
                // Release from the front so every release swaps
                for record in records {
                    backing.release(record).unwrap();
                }
                black_box(backing.capacity());
            },
        );
    });
}

// ---------------------------------------------------------------------------
// Geometry sync
// ---------------------------------------------------------------------------

fn bench_geometry_sync(c: &mut Criterion) {
    let mut device = RecordingDevice::new();
    let schema = Arc::new(VertexArraySchema::new(&sprite_attributes(), &GeometryLayout::new()).unwrap());
    let descriptor = GeometryDescriptor::new().with_instances(4096);
    let mut geometry = Geometry::new(&mut device, schema, &descriptor).unwrap();
    for _ in 0..4096 {
        let record = geometry.acquire().unwrap();
        geometry.write(&record, "transform", &Mat3::identity()).unwrap();
    }

    c.bench_function("geometry_sync_4096_instances", |b| {
        b.iter(|| {
            geometry.sync(&mut device);
            device.clear_commands();
        });
    });
}

// ---------------------------------------------------------------------------
// Pass compilation
// ---------------------------------------------------------------------------

fn bench_compile_renderer(c: &mut Criterion) {
    let mut device = RecordingDevice::new();
    let program = device.create_program(
        ProgramReflection::new()
            .with_attribute("corner", AttributeType::FloatVec2, 0)
            .with_uniform("camera", AttributeType::FloatMat3)
            .with_uniform("atlas", AttributeType::Sampler2d),
    );
    let shader = Arc::new(Shader::new(&mut device, program, "sprites").unwrap());
    let camera = Variable::shared_float(&Mat3::identity());

    let mut passes = vec![RenderPass::clear("clear", ClearColor::TRANSPARENT)];
    for i in 0..32 {
        passes.push(
            RenderPass::draw_to_canvas(format!("layer_{i}"))
                .with_shader(shader.clone())
                .with_uniform("camera", camera.clone())
                .with_sampler_dont_care("atlas")
                .with_draw(|_: &mut dyn Device| {}),
        );
    }

    c.bench_function("compile_renderer_33_passes", |b| {
        b.iter(|| black_box(compile_renderer(black_box(&passes))));
    });
}

criterion_group!(
    benches,
    bench_backing_churn,
    bench_geometry_sync,
    bench_compile_renderer,
);
criterion_main!(benches);
