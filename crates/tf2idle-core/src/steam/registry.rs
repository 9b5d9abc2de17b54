/// Low-detail, windowed 800x600 video settings that keep an idling TF2
/// client cheap. Imported with `regedit /s` before every launch.
pub const TF2_IDLE_SETTINGS: &str = r#"REGEDIT4

[HKEY_CURRENT_USER\Software\Valve\Source\tf\Settings]
"AutoConfigVersion"="dword:00000001"
"DXLevel_V1"="dword:00000051"
"mat_aaquality"="dword:00000000"
"mat_antialias"="dword:00000000"
"mat_bumpmap"="dword:00000000"
"mat_colorcorrection"="dword:00000000"
"mat_forceaniso"="dword:00000000"
"mat_forcehardwaresync"="dword:00000000"
"mat_hdr_level"="dword:00000000"
"mat_parallaxmap"="dword:00000000"
"mat_picmip"="dword:00000002"
"mat_reducefillrate"="dword:00000001"
"mat_specular"="dword:00000000"
"mat_trilinear"="dword:00000000"
"mat_vsync"="dword:00000000"
"MotionBlur"="dword:00000000"
"r_rootlod"="dword:00000002"
"r_shadowrendertotexture"="dword:00000000"
"r_waterforceexpensive"="dword:00000000"
"r_waterforcereflectentities"="dword:00000000"
"ScreenHeight"="dword:00000258"
"ScreenMonitorGamma"="2.2"
"ScreenMSAA"="dword:00000000"
"ScreenMSAAQuality"="dword:00000000"
"ScreenWidth"="dword:00000320"
"ScreenWindowed"="dword:00000001"
"ShadowDepthTexture"="dword:00000000"
"User Token 2"=""
"User Token 3"=""
"#;

pub const REG_FILE_NAME: &str = "tf2idle.reg";
