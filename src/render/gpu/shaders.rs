//! WGSL sources. Every kernel shares [`PRELUDE`]: the four bindings, the dispatch grid and the
//! colour helpers mirroring `foundation::math`.

use crate::render::passes::curve::{REGION_GAIN, REGIONS};
use crate::render::passes::film::{SHOULDER_KNEE, TOE_KNEE};

/// Module-level `const` declarations shared with the CPU passes.
pub(super) fn constants() -> String {
    let lo = REGIONS.map(|(lo, _)| lo);
    let hi = REGIONS.map(|(_, hi)| hi);
    format!(
        "const REGION_GAIN: f32 = {REGION_GAIN:?};\n\
         const REGION_LO: vec4<f32> = vec4<f32>({:?}, {:?}, {:?}, {:?});\n\
         const REGION_HI: vec4<f32> = vec4<f32>({:?}, {:?}, {:?}, {:?});\n\
         const SHOULDER_KNEE: f32 = {SHOULDER_KNEE:?};\n\
         const TOE_KNEE: f32 = {TOE_KNEE:?};\n",
        lo[0], lo[1], lo[2], lo[3], hi[0], hi[1], hi[2], hi[3],
    )
}

pub(super) const PRELUDE: &str = r#"
struct Params {
    // pixel_count, width, height, row_groups
    grid: vec4<u32>,
    info: vec4<u32>,
    v: array<vec4<f32>, 16>,
};

@group(0) @binding(0) var<storage, read> src: array<vec4<f32>>;
@group(0) @binding(1) var<storage, read_write> dst: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read> aux: array<f32>;
@group(0) @binding(3) var<uniform> params: Params;

const PI: f32 = 3.14159265358979;

fn pixel_index(gid: vec3<u32>) -> u32 {
    return gid.y * params.grid.w * 256u + gid.x;
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    return a + (b - a) * t;
}

fn lerp3(a: vec3<f32>, b: vec3<f32>, t: f32) -> vec3<f32> {
    return a + (b - a) * t;
}

fn wrap(x: f32, m: f32) -> f32 {
    return x - m * floor(x / m);
}

fn safe_pow(x: f32, e: f32) -> f32 {
    if (x <= 0.0) {
        return 0.0;
    }
    return pow(x, e);
}

fn smooth_step(e0: f32, e1: f32, x: f32) -> f32 {
    if (e1 <= e0) {
        return select(1.0, 0.0, x < e0);
    }
    let t = clamp((x - e0) / (e1 - e0), 0.0, 1.0);
    return t * t * (3.0 - 2.0 * t);
}

fn luma(c: vec3<f32>) -> f32 {
    return 0.2126 * c.r + 0.7152 * c.g + 0.0722 * c.b;
}

fn clamp01(c: vec3<f32>) -> vec3<f32> {
    return clamp(c, vec3<f32>(0.0), vec3<f32>(1.0));
}

fn srgb_to_linear(v: f32) -> f32 {
    let c = clamp(v, 0.0, 1.0);
    if (c <= 0.04045) {
        return c / 12.92;
    }
    return pow((c + 0.055) / 1.055, 2.4);
}

fn linear_to_srgb(v: f32) -> f32 {
    let c = clamp(v, 0.0, 1.0);
    if (c <= 0.0031308) {
        return c * 12.92;
    }
    return 1.055 * safe_pow(c, 1.0 / 2.4) - 0.055;
}

fn gain_linear(c: vec3<f32>, g: vec3<f32>) -> vec3<f32> {
    return vec3<f32>(
        linear_to_srgb(srgb_to_linear(c.r) * g.r),
        linear_to_srgb(srgb_to_linear(c.g) * g.g),
        linear_to_srgb(srgb_to_linear(c.b) * g.b),
    );
}

// t0: exposure gain, contrast factor, highlight and shadow weights.
// t1: white and black weights, exposure and contrast switches.
fn apply_tone(rgb: vec3<f32>, t0: vec4<f32>, t1: vec4<f32>) -> vec3<f32> {
    var c = rgb;
    if (t1.z != 0.0) {
        c = gain_linear(c, vec3<f32>(t0.x));
    }
    if (t1.w != 0.0) {
        c = (c - vec3<f32>(0.5)) * t0.y + vec3<f32>(0.5);
    }
    if (t0.z != 0.0 || t0.w != 0.0 || t1.x != 0.0 || t1.y != 0.0) {
        let l = clamp(luma(c), 0.0, 1.0);
        let hl = smooth_step(0.5, 1.0, l);
        let sh = 1.0 - smooth_step(0.0, 0.5, l);
        let wh = smooth_step(0.75, 1.0, l);
        let bl = 1.0 - smooth_step(0.0, 0.25, l);
        let delta = t0.z * hl + t0.w * sh + t1.x * wh + t1.y * bl;
        c = c + vec3<f32>(delta);
    }
    return c;
}

// Shadow, midtone and highlight offsets in rows `first..first + 3` of `params.v`.
fn zone_offsets(c: vec3<f32>, pivot: f32, width: f32, first: u32) -> vec3<f32> {
    let l = clamp(luma(c), 0.0, 1.0);
    let w_sh = 1.0 - smooth_step(pivot - width, pivot, l);
    let w_hi = smooth_step(pivot, pivot + width, l);
    let w_mid = max(1.0 - w_sh - w_hi, 0.0);
    let sh = params.v[first].xyz;
    let mid = params.v[first + 1u].xyz;
    let hi = params.v[first + 2u].xyz;
    return c + w_sh * sh + w_mid * mid + w_hi * hi;
}
"#;

pub(super) const MASTER: &str = r#"
fn saturate_rgb(c: vec3<f32>, saturation: f32, vibrance: f32) -> vec3<f32> {
    let l = luma(c);
    let chroma = max(max(c.r, c.g), c.b) - min(min(c.r, c.g), c.b);
    let k = (1.0 + saturation) * (1.0 + vibrance * (1.0 - clamp(chroma, 0.0, 1.0)));
    return vec3<f32>(l) + (c - vec3<f32>(l)) * k;
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let idx = pixel_index(gid);
    if (idx >= params.grid.x) {
        return;
    }
    let px = src[idx];
    var c = px.rgb;
    let wb = params.v[0];
    if (wb.w != 0.0) {
        c = gain_linear(c, wb.xyz);
    }
    c = apply_tone(c, params.v[1], params.v[2]);
    let s = params.v[3];
    if (s.x != 0.0 || s.y != 0.0) {
        c = saturate_rgb(c, s.x, s.y);
    }
    if (params.v[4].w != 0.0) {
        c = zone_offsets(c, s.z, s.w, 4u);
    }
    dst[idx] = vec4<f32>(clamp01(c), px.a);
}
"#;

pub(super) const HSL: &str = r#"
fn rgb_to_hsl(c: vec3<f32>) -> vec3<f32> {
    let mx = max(max(c.r, c.g), c.b);
    let mn = min(min(c.r, c.g), c.b);
    let l = (mx + mn) * 0.5;
    let d = mx - mn;
    if (d <= 1e-6) {
        return vec3<f32>(0.0, 0.0, l);
    }
    var s = d / (mx + mn);
    if (l > 0.5) {
        s = d / (2.0 - mx - mn);
    }
    var h = (c.r - c.g) / d + 4.0;
    if (mx == c.r) {
        h = (c.g - c.b) / d + select(0.0, 6.0, c.g < c.b);
    } else if (mx == c.g) {
        h = (c.b - c.r) / d + 2.0;
    }
    return vec3<f32>(h * 60.0, clamp(s, 0.0, 1.0), l);
}

fn hue_channel(p: f32, q: f32, t0: f32) -> f32 {
    let t = wrap(t0, 1.0);
    if (t < 1.0 / 6.0) {
        return p + (q - p) * 6.0 * t;
    }
    if (t < 0.5) {
        return q;
    }
    if (t < 2.0 / 3.0) {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    return p;
}

fn hsl_to_rgb(h0: f32, s: f32, l: f32) -> vec3<f32> {
    if (s <= 1e-6) {
        return vec3<f32>(l);
    }
    let h = wrap(h0, 360.0) / 360.0;
    var q = l + s - l * s;
    if (l < 0.5) {
        q = l * (1.0 + s);
    }
    let p = 2.0 * l - q;
    return vec3<f32>(
        hue_channel(p, q, h + 1.0 / 3.0),
        hue_channel(p, q, h),
        hue_channel(p, q, h - 1.0 / 3.0),
    );
}

fn center(i: u32) -> f32 {
    return params.v[8u + i / 4u][i % 4u];
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let idx = pixel_index(gid);
    if (idx >= params.grid.x) {
        return;
    }
    let px = src[idx];
    let hsl = rgb_to_hsl(clamp01(px.rgb));
    if (hsl.y <= 1e-6) {
        dst[idx] = px;
        return;
    }
    let h = wrap(hsl.x, 360.0);
    var i0 = 0u;
    var i1 = 1u;
    var w0 = 1.0;
    var w1 = 0.0;
    for (var i = 0u; i < 8u; i++) {
        let j = (i + 1u) % 8u;
        let lo = center(i);
        let hi = select(center(j), 360.0, j == 0u);
        if (h >= lo && h < hi) {
            let t = (h - lo) / (hi - lo);
            i0 = i;
            i1 = j;
            w0 = 1.0 - t;
            w1 = t;
            break;
        }
    }
    let blend = w0 * params.v[i0].xyz + w1 * params.v[i1].xyz;
    let h2 = hsl.x + blend.x;
    let s2 = clamp(hsl.y * (1.0 + blend.y), 0.0, 1.0);
    let l2 = clamp(hsl.z + blend.z * hsl.y, 0.0, 1.0);
    dst[idx] = vec4<f32>(hsl_to_rgb(h2, s2, l2), px.a);
}
"#;

pub(super) const CURVE: &str = r#"
fn lookup(channel: u32, x: f32) -> f32 {
    let n = params.info.x;
    let f = clamp(x, 0.0, 1.0) * f32(n - 1u);
    let i = min(u32(floor(f)), n - 1u);
    let j = min(i + 1u, n - 1u);
    let t = f - f32(i);
    return lerp(aux[channel * n + i], aux[channel * n + j], t);
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let idx = pixel_index(gid);
    if (idx >= params.grid.x) {
        return;
    }
    let px = src[idx];
    dst[idx] = vec4<f32>(lookup(0u, px.r), lookup(1u, px.g), lookup(2u, px.b), px.a);
}
"#;

pub(super) const FILM_GRADE: &str = r#"
fn lut_at(n: u32, r: u32, g: u32, b: u32) -> vec3<f32> {
    let i = ((b * n + g) * n + r) * 3u;
    return vec3<f32>(aux[i], aux[i + 1u], aux[i + 2u]);
}

fn lut_sample(c: vec3<f32>) -> vec3<f32> {
    let n = params.info.x;
    let top = vec3<u32>(n - 1u);
    let pos = clamp01(c) * f32(n - 1u);
    let i0 = min(vec3<u32>(floor(pos)), top);
    let i1 = min(i0 + vec3<u32>(1u), top);
    let t = pos - vec3<f32>(i0);
    let x00 = lerp3(lut_at(n, i0.x, i0.y, i0.z), lut_at(n, i1.x, i0.y, i0.z), t.x);
    let x10 = lerp3(lut_at(n, i0.x, i1.y, i0.z), lut_at(n, i1.x, i1.y, i0.z), t.x);
    let x01 = lerp3(lut_at(n, i0.x, i0.y, i1.z), lut_at(n, i1.x, i0.y, i1.z), t.x);
    let x11 = lerp3(lut_at(n, i0.x, i1.y, i1.z), lut_at(n, i1.x, i1.y, i1.z), t.x);
    let y0 = lerp3(x00, x10, t.y);
    let y1 = lerp3(x01, x11, t.y);
    return lerp3(y0, y1, t.z);
}

fn tone_regions(x: f32, amounts: vec4<f32>) -> f32 {
    let los = REGION_LO;
    let his = REGION_HI;
    var y = x;
    for (var k = 0u; k < 4u; k++) {
        let a = amounts[k];
        let lo = los[k];
        let hi = his[k];
        if (a == 0.0 || x <= lo || x >= hi) {
            continue;
        }
        let t = (x - lo) / (hi - lo);
        y += a / 100.0 * REGION_GAIN * sin(t * PI) * (hi - lo);
    }
    return clamp(y, 0.0, 1.0);
}

fn tone_response(x: f32, shoulder: f32, toe: f32, gamma: f32) -> f32 {
    var y = safe_pow(x, 1.0 / max(gamma, 0.1));
    if (shoulder != 0.0 && y > SHOULDER_KNEE) {
        let u = (y - SHOULDER_KNEE) / (1.0 - SHOULDER_KNEE);
        let e = 1.0 / max(1.0 + shoulder, 0.2);
        y = SHOULDER_KNEE + (1.0 - SHOULDER_KNEE) * (1.0 - safe_pow(1.0 - u, e));
    }
    if (toe != 0.0 && y < TOE_KNEE) {
        let e = 1.0 / max(1.0 + toe, 0.2);
        y = TOE_KNEE * safe_pow(y / TOE_KNEE, e);
    }
    return y;
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let idx = pixel_index(gid);
    if (idx >= params.grid.x) {
        return;
    }
    let px = src[idx];
    let flags = params.v[0];
    var c = px.rgb;
    if (params.info.x != 0u) {
        c = lerp3(c, lut_sample(c), flags.x);
    }
    if (flags.y != 0.0) {
        let m = c;
        c = vec3<f32>(dot(params.v[1].xyz, m), dot(params.v[2].xyz, m), dot(params.v[3].xyz, m));
    }
    c = apply_tone(c, params.v[4], params.v[5]);
    // x: region switch, then shoulder, toe and gamma.
    let curve = params.v[7];
    if (curve.x != 0.0) {
        let r = params.v[6];
        c = vec3<f32>(
            tone_regions(clamp(c.r, 0.0, 1.0), r),
            tone_regions(clamp(c.g, 0.0, 1.0), r),
            tone_regions(clamp(c.b, 0.0, 1.0), r),
        );
    }
    if (flags.z != 0.0) {
        c = vec3<f32>(
            tone_response(clamp(c.r, 0.0, 1.0), curve.y, curve.z, curve.w),
            tone_response(clamp(c.g, 0.0, 1.0), curve.y, curve.z, curve.w),
            tone_response(clamp(c.b, 0.0, 1.0), curve.y, curve.z, curve.w),
        );
    }
    if (flags.w != 0.0) {
        c = zone_offsets(c, 0.5, 0.5, 8u);
    }
    let lift = params.v[11].x;
    if (lift > 0.0) {
        c = c * (1.0 - lift) + vec3<f32>(lift);
    }
    dst[idx] = vec4<f32>(clamp01(c), px.a);
}
"#;

pub(super) const OPTICS: &str = r#"
fn vignette_mask(nx: f32, ny: f32, aspect: f32, v: vec4<f32>) -> f32 {
    let t = (v.z + 1.0) * 0.5;
    let sx = 1.0 + (max(aspect, 1.0) - 1.0) * t;
    let sy = 1.0 + (max(1.0 / aspect, 1.0) - 1.0) * t;
    let d = sqrt((nx * sx) * (nx * sx) + (ny * sy) * (ny * sy)) / sqrt(sx * sx + sy * sy);
    let inner = clamp(v.y, 0.0, 1.0);
    let outer = min(inner + max(v.w, 0.01), 1.5);
    return smooth_step(inner, outer, d);
}

fn screen_glow(c0: vec3<f32>, base: u32, amount: f32) -> vec3<f32> {
    var c = c0;
    for (var k = 0u; k < 3u; k++) {
        let add = clamp(aux[base + k] * amount, 0.0, 1.0);
        c[k] = 1.0 - (1.0 - c[k]) * (1.0 - add);
    }
    return c;
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let idx = pixel_index(gid);
    if (idx >= params.grid.x) {
        return;
    }
    let w = params.grid.y;
    let h = params.grid.z;
    let px = src[idx];
    let k = params.v[0];
    var c = px.rgb;
    if (params.info.z != 0u) {
        c = screen_glow(c, params.info.x + idx * 3u, k.x);
    }
    if (params.info.w != 0u) {
        c = screen_glow(c, params.info.y + idx * 3u, k.y);
    }
    let nx = (f32(idx % w) + 0.5) / f32(w) * 2.0 - 1.0;
    let ny = (f32(idx / w) + 0.5) / f32(h) * 2.0 - 1.0;
    if (k.z != 0.0) {
        let r2 = (nx * nx + ny * ny) * 0.5;
        c = c * (1.0 + k.z * r2);
    }
    if (k.w != 0.0) {
        let v = params.v[1];
        let m = vignette_mask(nx, ny, f32(w) / f32(h), v);
        if (v.x < 0.0) {
            c = c * (1.0 + v.x * m);
        } else {
            c = c + (vec3<f32>(1.0) - c) * v.x * m;
        }
    }
    dst[idx] = vec4<f32>(clamp01(c), px.a);
}
"#;

pub(super) const GEOMETRY: &str = r#"
fn texel(x: i32, y: i32) -> vec4<f32> {
    let xi = clamp(x, 0, i32(params.info.x) - 1);
    let yi = clamp(y, 0, i32(params.info.y) - 1);
    return src[u32(yi) * params.info.x + u32(xi)];
}

fn bilinear(p: vec2<f32>) -> vec4<f32> {
    let q = p - vec2<f32>(0.5);
    let f = floor(q);
    let t = q - f;
    let x0 = i32(f.x);
    let y0 = i32(f.y);
    let p00 = texel(x0, y0);
    let p01 = texel(x0, y0 + 1);
    let top = p00 + (texel(x0 + 1, y0) - p00) * t.x;
    let bot = p01 + (texel(x0 + 1, y0 + 1) - p01) * t.x;
    return top + (bot - top) * t.y;
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let idx = pixel_index(gid);
    if (idx >= params.grid.x) {
        return;
    }
    let out_w = params.grid.y;
    let out_h = params.grid.z;
    let sw = f32(params.info.x);
    let sh = f32(params.info.y);
    let turns = params.info.z;
    let flags = params.info.w;
    var tw = sw;
    var th = sh;
    if (turns % 2u == 1u) {
        tw = sh;
        th = sw;
    }

    var u = (f32(idx % out_w) + 0.5) / f32(out_w);
    var v = (f32(idx / out_w) + 0.5) / f32(out_h);
    if ((flags & 1u) != 0u) {
        u = 1.0 - u;
    }
    if ((flags & 2u) != 0u) {
        v = 1.0 - v;
    }
    let crop = params.v[0];
    let a = params.v[1];
    let b = params.v[2];
    let q = vec2<f32>((crop.x + u * crop.z) * tw, (crop.y + v * crop.w) * th);
    let r = vec2<f32>(a.x * q.x + a.z * q.y + b.x, a.y * q.x + a.w * q.y + b.y);

    let nx = (r.x - tw * 0.5) / (tw * 0.5);
    let ny = (r.y - th * 0.5) / (th * 0.5);
    let wd = max(1.0 + b.z * nx + b.w * ny, 0.05);
    let t = vec2<f32>(tw * 0.5 * (1.0 + nx / wd), th * 0.5 * (1.0 + ny / wd));
    var p = t;
    switch turns {
        case 1u: { p = vec2<f32>(t.y, sh - t.x); }
        case 2u: { p = vec2<f32>(sw - t.x, sh - t.y); }
        case 3u: { p = vec2<f32>(sw - t.y, t.x); }
        default: {}
    }

    var pr = p;
    var pg = p;
    var pb = p;
    if ((flags & 4u) != 0u) {
        let lens = params.v[3];
        let c = vec2<f32>(sw * 0.5, sh * 0.5);
        let half_diag = max(length(c), 1.0);
        let d = (p - c) / half_diag;
        let r2 = dot(d, d);
        let f = 1.0 + lens.x * r2 + lens.y * r2 * r2;
        pr = c + d * ((f + lens.z / half_diag) * half_diag);
        pg = c + d * (f * half_diag);
        pb = c + d * ((f + lens.w / half_diag) * half_diag);
    }
    if (pg.x < -0.5 || pg.y < -0.5 || pg.x > sw + 0.5 || pg.y > sh + 0.5) {
        dst[idx] = vec4<f32>(0.0);
        return;
    }
    let g = bilinear(pg);
    let red = bilinear(pr);
    let blue = bilinear(pb);
    dst[idx] = vec4<f32>(red.r, g.g, blue.b, g.a);
}
"#;
